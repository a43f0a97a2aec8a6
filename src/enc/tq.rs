use crate::def::*;

/*****************************************************************************
 * quantizer step tables
 *
 * Monotone in qindex, dc step slightly below ac. Steps are expressed in the
 * same scale as the Hadamard coefficients (8x the orthonormal transform).
 *****************************************************************************/
lazy_static! {
    static ref QUANT_TBL: [(u16, u16); 256] = {
        let mut tbl = [(0u16, 0u16); 256];
        for q in 0..256 {
            let qi = q as u32;
            let ac = qi * qi / 48 + 2 * qi + 4;
            let dc = (ac * 7 + 4) / 8;
            tbl[q] = (dc as u16, ac as u16);
        }
        tbl
    };
}

#[inline]
pub fn dc_quant(qindex: u8) -> u32 {
    QUANT_TBL[qindex as usize].0 as u32
}

#[inline]
pub fn ac_quant(qindex: u8) -> u32 {
    QUANT_TBL[qindex as usize].1 as u32
}

/*****************************************************************************
 * Hadamard transforms, 16-bit low-precision path
 *
 * 8x8 and 4x4 are plain unnormalized butterflies; 16x16 combines four 8x8
 * results with a >>1 stage so everything stays within i16.
 *****************************************************************************/
fn hadamard4(a: i16, b: i16, c: i16, d: i16) -> (i16, i16, i16, i16) {
    let s0 = a + b;
    let s1 = a - b;
    let s2 = c + d;
    let s3 = c - d;
    (s0 + s2, s1 + s3, s0 - s2, s1 - s3)
}

pub(crate) fn hadamard_4x4(input: &[i16], stride: usize, out: &mut [i16]) {
    let mut tmp = [0i16; 16];
    for i in 0..4 {
        let (a, b, c, d) = hadamard4(
            input[i],
            input[stride + i],
            input[2 * stride + i],
            input[3 * stride + i],
        );
        tmp[i] = a;
        tmp[4 + i] = b;
        tmp[8 + i] = c;
        tmp[12 + i] = d;
    }
    for i in 0..4 {
        let r = &tmp[4 * i..4 * i + 4];
        let (a, b, c, d) = hadamard4(r[0], r[1], r[2], r[3]);
        out[4 * i] = a;
        out[4 * i + 1] = b;
        out[4 * i + 2] = c;
        out[4 * i + 3] = d;
    }
}

fn hadamard8(v: &mut [i16; 8]) {
    let s0 = v[0] + v[1];
    let s1 = v[0] - v[1];
    let s2 = v[2] + v[3];
    let s3 = v[2] - v[3];
    let s4 = v[4] + v[5];
    let s5 = v[4] - v[5];
    let s6 = v[6] + v[7];
    let s7 = v[6] - v[7];

    let t0 = s0 + s2;
    let t1 = s1 + s3;
    let t2 = s0 - s2;
    let t3 = s1 - s3;
    let t4 = s4 + s6;
    let t5 = s5 + s7;
    let t6 = s4 - s6;
    let t7 = s5 - s7;

    v[0] = t0 + t4;
    v[1] = t1 + t5;
    v[2] = t2 + t6;
    v[3] = t3 + t7;
    v[4] = t0 - t4;
    v[5] = t1 - t5;
    v[6] = t2 - t6;
    v[7] = t3 - t7;
}

pub fn hadamard_8x8(input: &[i16], stride: usize, out: &mut [i16]) {
    let mut tmp = [0i16; 64];
    let mut col = [0i16; 8];
    for i in 0..8 {
        for j in 0..8 {
            col[j] = input[j * stride + i];
        }
        hadamard8(&mut col);
        for j in 0..8 {
            tmp[j * 8 + i] = col[j];
        }
    }
    let mut row = [0i16; 8];
    for j in 0..8 {
        row.copy_from_slice(&tmp[j * 8..j * 8 + 8]);
        hadamard8(&mut row);
        out[j * 8..j * 8 + 8].copy_from_slice(&row);
    }
}

pub fn hadamard_16x16(input: &[i16], stride: usize, out: &mut [i16]) {
    /* four 8x8 transforms into the quadrants of out */
    let mut sub = [[0i16; 64]; 4];
    hadamard_8x8(input, stride, &mut sub[0]);
    hadamard_8x8(&input[8..], stride, &mut sub[1]);
    hadamard_8x8(&input[8 * stride..], stride, &mut sub[2]);
    hadamard_8x8(&input[8 * stride + 8..], stride, &mut sub[3]);

    /* cross-combine with >>1 to stay in 16 bits */
    for k in 0..64 {
        let a0 = sub[0][k] as i32;
        let a1 = sub[1][k] as i32;
        let a2 = sub[2][k] as i32;
        let a3 = sub[3][k] as i32;

        let b0 = (a0 + a1) >> 1;
        let b1 = (a0 - a1) >> 1;
        let b2 = (a2 + a3) >> 1;
        let b3 = (a2 - a3) >> 1;

        let r = k / 8;
        let c = k % 8;
        out[r * 16 + c] = (b0 + b2) as i16;
        out[r * 16 + c + 8] = (b1 + b3) as i16;
        out[(r + 8) * 16 + c] = (b0 - b2) as i16;
        out[(r + 8) * 16 + c + 8] = (b1 - b3) as i16;
    }
}

/// Dead-zone quantizer over a coefficient tile. Returns the count of nonzero
/// quantized coefficients; 0 means the tile codes to nothing.
pub fn quantize_lp(
    coeff: &[i16],
    n: usize,
    dequant_dc: u32,
    dequant_ac: u32,
    qcoeff: &mut [i16],
    dqcoeff: &mut [i16],
) -> usize {
    let mut eob = 0usize;
    for i in 0..n {
        let dq = if i == 0 { dequant_dc } else { dequant_ac } as i32;
        let c = coeff[i] as i32;
        let abs = c.abs();
        /* 3/8 dead-zone rounding */
        let q = (abs + (dq * 3 >> 3)) / dq;
        if q != 0 {
            eob += 1;
        }
        let q = if c < 0 { -q } else { q };
        qcoeff[i] = q as i16;
        dqcoeff[i] = (q * dq) as i16;
    }
    eob
}

pub(crate) fn block_error_lp(coeff: &[i16], dqcoeff: &[i16], n: usize) -> i64 {
    let mut err = 0i64;
    for i in 0..n {
        let d = coeff[i] as i64 - dqcoeff[i] as i64;
        err += d * d;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpolate_name::interpolate_test;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn residual(n: usize, seed: u64) -> Vec<i16> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        (0..n * n).map(|_| rng.gen_range(-255, 256)).collect()
    }

    fn hadamard(n: usize, input: &[i16], out: &mut [i16]) {
        match n {
            4 => hadamard_4x4(input, n, out),
            8 => hadamard_8x8(input, n, out),
            16 => hadamard_16x16(input, n, out),
            _ => unreachable!(),
        }
    }

    /* energy scales by the unnormalized transform gain; the 16x16 combine
     * truncates, so that size is checked with a tolerance */
    #[interpolate_test(sz4, 4)]
    #[interpolate_test(sz8, 8)]
    #[interpolate_test(sz16, 16)]
    fn hadamard_energy(n: usize) {
        let input = residual(n, 0xbeef + n as u64);
        let mut out = vec![0i16; n * n];
        hadamard(n, &input, &mut out);

        let pix: i64 = input.iter().map(|&v| v as i64 * v as i64).sum();
        let tx: i64 = out.iter().map(|&v| v as i64 * v as i64).sum();
        let gain = match n {
            4 => 16,
            _ => 64,
        };
        if n < 16 {
            assert_eq!(tx, pix * gain);
        } else {
            let expect = pix * gain;
            assert!((tx - expect).abs() < expect / 100);
        }
    }

    #[test]
    fn hadamard_dc_of_flat_input() {
        let input = vec![3i16; 64];
        let mut out = vec![0i16; 64];
        hadamard_8x8(&input, 8, &mut out);
        assert_eq!(out[0], 3 * 64);
        assert!(out[1..].iter().all(|&v| v == 0));
    }

    #[test]
    fn quant_tables_monotone() {
        for q in 1..256usize {
            assert!(ac_quant(q as u8) >= ac_quant((q - 1) as u8));
            assert!(dc_quant(q as u8) <= ac_quant(q as u8));
            assert!(dc_quant(q as u8) > 0);
        }
    }

    #[test]
    fn quantize_zero_residual() {
        let coeff = [0i16; 64];
        let mut qcoeff = [0i16; 64];
        let mut dqcoeff = [0i16; 64];
        let eob = quantize_lp(&coeff, 64, dc_quant(80), ac_quant(80), &mut qcoeff, &mut dqcoeff);
        assert_eq!(eob, 0);
        assert!(qcoeff.iter().all(|&c| c == 0));
    }

    #[test]
    fn quantize_dead_zone_kills_small_coeffs() {
        let dq = ac_quant(120);
        let mut coeff = [0i16; 64];
        coeff[1] = (dq / 2) as i16;
        let mut qcoeff = [0i16; 64];
        let mut dqcoeff = [0i16; 64];
        let eob = quantize_lp(&coeff, 64, dc_quant(120), dq, &mut qcoeff, &mut dqcoeff);
        assert_eq!(eob, 0);
    }

    #[test]
    fn quantize_error_bounded_by_step() {
        let coeff = residual(8, 42);
        let mut qcoeff = [0i16; 64];
        let mut dqcoeff = [0i16; 64];
        let dc = dc_quant(60);
        let ac = ac_quant(60);
        quantize_lp(&coeff, 64, dc, ac, &mut qcoeff, &mut dqcoeff);
        for i in 0..64 {
            let step = if i == 0 { dc } else { ac } as i64;
            assert!((coeff[i] as i64 - dqcoeff[i] as i64).abs() <= step);
        }
        assert!(block_error_lp(&coeff, &dqcoeff, 64) <= 64 * ac as i64 * ac as i64);
    }
}
