use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fpsift_core::{DescriptorMatrix, DESCRIPTOR_SIZE};
use fpsift_match::{
    ApproximateMatcher, BruteForceMatcher, FlannMatcher, MatcherConfig, TemplateMatcher,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Random SIFT-like descriptors with values in 0..=255
fn create_descriptors(rows: usize, seed: u64) -> DescriptorMatrix {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let data: Vec<f32> = (0..rows * DESCRIPTOR_SIZE)
        .map(|_| rng.gen_range(0..=255u8) as f32)
        .collect();
    DescriptorMatrix::from_flat(DESCRIPTOR_SIZE, data).unwrap()
}

/// Benchmark 2-NN search as the train set grows
fn bench_train_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("flann_train_size");
    let query = create_descriptors(200, 1);
    let flann = FlannMatcher::default();
    for &rows in &[100usize, 500, 2000] {
        let train = create_descriptors(rows, 6);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &train, |b, train| {
            b.iter(|| black_box(flann.knn_match(black_box(&query), black_box(train), 2).unwrap()))
        });
    }
    group.finish();
}

/// Benchmark 2-NN search, approximate against exact
fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_match");
    let query = create_descriptors(500, 2);
    let train = create_descriptors(500, 3);

    let flann = FlannMatcher::default();
    group.bench_function("flann_500x500", |b| {
        b.iter(|| black_box(flann.knn_match(black_box(&query), black_box(&train), 2).unwrap()))
    });

    let brute = BruteForceMatcher::new();
    group.bench_function("brute_force_500x500", |b| {
        b.iter(|| black_box(brute.knn_match(black_box(&query), black_box(&train), 2).unwrap()))
    });
    group.finish();
}

/// Benchmark full comparison including the ratio test
fn bench_compare(c: &mut Criterion) {
    let a = create_descriptors(500, 4);
    let b = create_descriptors(500, 5);
    let matcher = TemplateMatcher::from_config(&MatcherConfig::default()).unwrap();
    c.bench_function("compare_500", |bench| {
        bench.iter(|| black_box(matcher.compare_descriptors(black_box(&a), black_box(&b)).unwrap()))
    });
}

criterion_group!(benches, bench_train_size, bench_knn, bench_compare);
criterion_main!(benches);
