use crate::def::*;

/// One luma or chroma pixel plane, row-major with an explicit stride.
///
/// The mode-decision kernels never write outside a plane; reads past an edge
/// are clamped to the border pel, which models the padded reconstruction
/// buffers of a full encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub data: Vec<pel>,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Self {
        Plane {
            data: vec![0; width * height],
            width,
            height,
            stride: width,
        }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> pel>(width: usize, height: usize, mut f: F) -> Self {
        let mut p = Plane::new(width, height);
        for y in 0..height {
            for x in 0..width {
                p.data[y * p.stride + x] = f(x, y);
            }
        }
        p
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[pel] {
        &self.data[y * self.stride..y * self.stride + self.width]
    }

    #[inline]
    pub fn pel_at(&self, x: usize, y: usize) -> pel {
        self.data[y * self.stride + x]
    }

    /* border-clamped read, used by interpolation and out-of-frame motion */
    #[inline]
    pub(crate) fn pel_clamped(&self, x: isize, y: isize) -> pel {
        let cx = x.max(0).min(self.width as isize - 1) as usize;
        let cy = y.max(0).min(self.height as isize - 1) as usize;
        self.data[cy * self.stride + cx]
    }

    /* copy a w x h region starting at (x, y) into dst, clamped at borders */
    pub(crate) fn read_block(
        &self,
        x: isize,
        y: isize,
        w: usize,
        h: usize,
        dst: &mut [pel],
        dst_stride: usize,
    ) {
        for j in 0..h {
            for i in 0..w {
                dst[j * dst_stride + i] = self.pel_clamped(x + i as isize, y + j as isize);
            }
        }
    }
}

/// A 4:2:0 picture: `planes[0]` luma, `planes[1..]` chroma at half resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub planes: [Plane; 3],
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Frame {
            planes: [
                Plane::new(width, height),
                Plane::new(width >> 1, height >> 1),
                Plane::new(width >> 1, height >> 1),
            ],
        }
    }
}
