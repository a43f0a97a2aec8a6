use criterion::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use ravt::bench::tq::*;

criterion_group!(
    tq,
    bench_hadamard_8x8,
    bench_hadamard_16x16,
    bench_quantize_lp_16x16,
);

fn bench_hadamard_8x8(c: &mut Criterion) {
    let mut ra = ChaChaRng::from_seed([0; 32]);
    let diff: Vec<i16> = (0..8 * 8).map(|_| ra.gen_range(-255, 256)).collect();
    let mut coeff = vec![0i16; 8 * 8];

    c.bench_function("bench_hadamard_8x8", move |b| {
        b.iter(|| hadamard_8x8(&diff[..], 8, &mut coeff[..]))
    });
}

fn bench_hadamard_16x16(c: &mut Criterion) {
    let mut ra = ChaChaRng::from_seed([0; 32]);
    let diff: Vec<i16> = (0..16 * 16).map(|_| ra.gen_range(-255, 256)).collect();
    let mut coeff = vec![0i16; 16 * 16];

    c.bench_function("bench_hadamard_16x16", move |b| {
        b.iter(|| hadamard_16x16(&diff[..], 16, &mut coeff[..]))
    });
}

fn bench_quantize_lp_16x16(c: &mut Criterion) {
    let mut ra = ChaChaRng::from_seed([0; 32]);
    let coeff: Vec<i16> = (0..16 * 16).map(|_| ra.gen_range(-2048, 2048)).collect();
    let mut qcoeff = vec![0i16; 16 * 16];
    let mut dqcoeff = vec![0i16; 16 * 16];
    let (dc, ac) = (dc_quant(120), ac_quant(120));

    c.bench_function("bench_quantize_lp_16x16", move |b| {
        b.iter(|| {
            quantize_lp(
                &coeff[..],
                16 * 16,
                dc,
                ac,
                &mut qcoeff[..],
                &mut dqcoeff[..],
            )
        })
    });
}
