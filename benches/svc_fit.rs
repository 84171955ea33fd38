use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use irisflow::dataset::{CLASS_LABELS, SPLIT_SEED, TEST_FRACTION, load_bundled, train_test_split};
use irisflow::ml::svc::{KernelKind, TrainOptions, train_svc};

fn bench_fit(c: &mut Criterion) {
    let data = load_bundled().expect("bundled dataset");
    let split = train_test_split(&data, TEST_FRACTION, SPLIT_SEED).expect("split");
    for kind in [KernelKind::Linear, KernelKind::Rbf] {
        let options = TrainOptions {
            kernel: kind,
            ..TrainOptions::default()
        };
        c.bench_with_input(
            BenchmarkId::new("fit", kind.name()),
            &options,
            |b, options| {
                b.iter(|| {
                    train_svc(black_box(&split.train), &CLASS_LABELS, options).expect("fit");
                });
            },
        );
    }
}

fn bench_predict(c: &mut Criterion) {
    let data = load_bundled().expect("bundled dataset");
    let model = train_svc(&data, &CLASS_LABELS, &TrainOptions::default()).expect("fit");
    c.bench_function("predict_150", |b| {
        b.iter(|| model.predict(black_box(&data.features)));
    });
}

criterion_group!(benches, bench_fit, bench_predict);
criterion_main!(benches);
