use crate::def::*;

/// Closed-form rate/distortion estimate for a residual block under a
/// Laplacian source assumption: rate grows with log2 of the energy-to-step
/// ratio, distortion saturates at the quantizer granularity.
///
/// `sse` is the raw residual energy, `qstep` the ac quantizer step. The
/// returned rate is in cost units (512 = one bit); the distortion is
/// unscaled pixel-domain sse and must be shifted by the caller to the
/// encoder's `<< 4` convention.
pub(crate) fn model_rd_from_sse(sse: i64, area_log2: usize, qstep: u32) -> (i32, i64) {
    if sse <= 0 {
        return (0, 0);
    }
    let n = 1i64 << area_log2;
    let q = qstep.max(1) as i64;
    let qsq = q * q;

    /* 16 * per-pel energy relative to the step; 0 means everything falls in
     * the dead zone */
    let ratio = (sse << 4) / (n * qsq);
    if ratio == 0 {
        return (0, sse);
    }

    /* 512-scaled log2(1 + ratio) with linear interpolation */
    let v = (ratio + 1) as u64;
    let l = 63 - v.leading_zeros() as i64;
    let frac = if l > 0 {
        (((v - (1 << l)) << 9) >> l) as i64
    } else {
        0
    };
    let bits_x512 = (l << 9) + frac;

    let rate = ((n * bits_x512) >> 5) as i32;
    let dist = (n * qsq / 12).min(sse);
    (rate, dist)
}

/// Speed >= 8 relaxes the ac energy threshold on calm, large blocks.
pub(crate) fn ac_thr_factor(speed: u8, width: usize, height: usize, norm_sum: i64) -> i64 {
    if speed >= 8 && norm_sum < 5 {
        if width >= 32 && height >= 32 {
            4
        } else {
            2
        }
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sse_is_free() {
        assert_eq!(model_rd_from_sse(0, 6, 100), (0, 0));
    }

    #[test]
    fn dead_zone_sse_codes_to_nothing() {
        /* tiny energy against a coarse step: no rate, all error remains */
        let (rate, dist) = model_rd_from_sse(30, 8, 400);
        assert_eq!(rate, 0);
        assert_eq!(dist, 30);
    }

    #[test]
    fn rate_monotone_in_sse() {
        let mut last = 0;
        for sse in &[1_000i64, 10_000, 100_000, 1_000_000] {
            let (rate, _) = model_rd_from_sse(*sse, 8, 40);
            assert!(rate >= last);
            last = rate;
        }
        assert!(last > 0);
    }

    #[test]
    fn rate_decreases_with_coarser_quant() {
        let (r_fine, _) = model_rd_from_sse(500_000, 10, 20);
        let (r_coarse, _) = model_rd_from_sse(500_000, 10, 200);
        assert!(r_coarse < r_fine);
    }

    #[test]
    fn dist_bounded_by_sse() {
        for qstep in &[10u32, 100, 1000] {
            let (_, dist) = model_rd_from_sse(40_000, 8, *qstep);
            assert!(dist <= 40_000);
        }
    }

    #[test]
    fn thr_factor_speed_gate() {
        assert_eq!(ac_thr_factor(7, 64, 64, 0), 1);
        assert_eq!(ac_thr_factor(8, 64, 64, 4), 4);
        assert_eq!(ac_thr_factor(8, 16, 16, 4), 2);
        assert_eq!(ac_thr_factor(8, 64, 64, 9), 1);
    }
}
