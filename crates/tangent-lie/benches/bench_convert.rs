use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::Rng;
use tangent_lie::{matrix_to_quaternion, matrix_to_similarity, quaternion_to_matrix};

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");

    for batch in [1, 64, 4096] {
        let mut rng = rand::rng();
        let q = Array2::<f32>::from_shape_fn((batch, 4), |_| rng.random_range(-1.0..1.0));
        let rot = quaternion_to_matrix(&q).unwrap();
        let scaled = &rot * 2.0;

        group.bench_with_input(BenchmarkId::new("quaternion", batch), &rot, |b, rot| {
            b.iter(|| std::hint::black_box(matrix_to_quaternion(rot, false)))
        });

        group.bench_with_input(
            BenchmarkId::new("quaternion_checked", batch),
            &rot,
            |b, rot| b.iter(|| std::hint::black_box(matrix_to_quaternion(rot, true))),
        );

        group.bench_with_input(BenchmarkId::new("similarity", batch), &scaled, |b, mat| {
            b.iter(|| std::hint::black_box(matrix_to_similarity(mat, false)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
