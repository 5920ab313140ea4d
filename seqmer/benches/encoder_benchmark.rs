use criterion::{criterion_group, criterion_main, Criterion};
use seqmer::{Encoder, ScoreScheme, Spacer};

fn performance_test(c: &mut Criterion) {
    let seq: Vec<u8> = b"ACGATCGACGACGATTTACGACGACGATCAGCATCGATCGACGATCGACGACG".to_vec();

    let enc = Encoder::new(Spacer::contiguous(13).unwrap(), true, ScoreScheme::Lex);
    c.bench_function("windows", |b| {
        b.iter(|| enc.windows(&seq).count());
    });

    let enc = Encoder::new(Spacer::new(13, 19, vec![1; 6]).unwrap(), true, ScoreScheme::Lex);
    c.bench_function("minimizers", |b| {
        b.iter(|| enc.minimizers(&seq).count());
    });
}

criterion_group!(benches, performance_test);
criterion_main!(benches);
