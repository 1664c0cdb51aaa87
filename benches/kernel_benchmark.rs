//! Benchmarks for kernel evaluation, training and prediction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use svmlearn::{
    ClassificationDataSet, ClassificationModel, Dataset, Kernel, LinearKernel, PolynomialKernel,
    PredictorBackend, RBFKernel, SparseVector, TestDataSet,
};

fn random_rows(n: usize, dim: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn blobs(n: usize, dim: usize) -> ClassificationDataSet {
    let mut rng = StdRng::seed_from_u64(7);
    let mut rows = random_rows(n, dim, &mut rng);
    let labels: Vec<i32> = (0..n).map(|i| (i % 3) as i32).collect();
    for (row, &label) in rows.iter_mut().zip(&labels) {
        row[0] += 2.0 * label as f64;
    }
    ClassificationDataSet::new(labels, rows).expect("benchmark data is well formed")
}

fn bench_kernels(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let rows = random_rows(2, 100, &mut rng);
    let x = SparseVector::from_dense(&rows[0]);
    let y = SparseVector::from_dense(&rows[1]);

    let mut group = c.benchmark_group("kernel_compute");
    group.bench_function("linear", |b| {
        let kernel = LinearKernel::new();
        b.iter(|| kernel.compute(black_box(&x), black_box(&y)))
    });
    group.bench_function("polynomial", |b| {
        let kernel = PolynomialKernel::new(3, 0.01, 1.0);
        b.iter(|| kernel.compute(black_box(&x), black_box(&y)))
    });
    group.bench_function("rbf", |b| {
        let kernel = RBFKernel::new(0.01);
        b.iter(|| kernel.compute(black_box(&x), black_box(&y)))
    });
    group.finish();
}

fn bench_train(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_c_svc_rbf");
    group.sample_size(10);
    for size in [100, 300] {
        let data = blobs(size, 10);
        let model = ClassificationModel::c_svc(RBFKernel::new(data.gamma()));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| model.fit(black_box(data)))
        });
    }
    group.finish();
}

fn bench_precomputed_train(c: &mut Criterion) {
    let data = blobs(300, 10);
    let precomputed = data.precompute(RBFKernel::new(data.gamma()));
    let model = ClassificationModel::c_svc(RBFKernel::new(data.gamma()));

    let mut group = c.benchmark_group("train_precomputed");
    group.sample_size(10);
    group.bench_function("rbf_300", |b| b.iter(|| model.fit(black_box(&precomputed))));
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let data = blobs(300, 10);
    let test = TestDataSet::from_dataset(&data);
    let model = ClassificationModel::c_svc(LinearKernel::new());

    let mut group = c.benchmark_group("predict_linear_300");
    for backend in [PredictorBackend::Native, PredictorBackend::Reference] {
        let mut results = model
            .fit_with(&data, backend)
            .expect("benchmark data trains");
        group.bench_function(format!("{backend:?}"), |b| {
            b.iter(|| results.predict(black_box(&test)))
        });
        if backend == PredictorBackend::Reference {
            results.compact().expect("linear expansions compact");
            group.bench_function("ReferenceCompact", |b| {
                b.iter(|| results.predict(black_box(&test)))
            });
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_kernels,
    bench_train,
    bench_precomputed_train,
    bench_predict
);
criterion_main!(benches);
