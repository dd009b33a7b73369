use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use enginml::metrics::{classification_metrics, regression_metrics, silhouette_score};
use enginml::{
    FitOptions, ReportWriter, Target, TaskType, fit_clustering, fit_regression, synthetic,
};

const ROWS: usize = 1_000;

fn bench_metrics(c: &mut Criterion) {
    let data = synthetic::linear_regression(ROWS, 5, 0.5, 7);
    let y = data.target().and_then(Target::as_continuous).expect("targets").clone();
    let predicted = y.mapv(|v| v * 0.9 + 0.1);
    c.bench_function("regression_metrics", |b| {
        b.iter(|| {
            regression_metrics(black_box(y.view()), black_box(predicted.view())).expect("metrics")
        });
    });

    let labels = ndarray::Array1::from_shape_fn(ROWS, |i| i % 5);
    let shifted = labels.mapv(|l| (l + 1) % 5);
    c.bench_function("classification_metrics", |b| {
        b.iter(|| {
            classification_metrics(black_box(labels.view()), black_box(shifted.view()))
                .expect("metrics")
        });
    });

    let mut group = c.benchmark_group("silhouette");
    for rows in [200usize, 500] {
        let blobs = synthetic::blobs(rows, 4, 0.6, 2, 3);
        let truth = blobs.target().and_then(Target::as_labels).expect("labels").clone();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                silhouette_score(black_box(blobs.features().view()), black_box(truth.view()))
                    .expect("silhouette")
            });
        });
    }
    group.finish();
}

fn bench_report_render(c: &mut Criterion) {
    let writer = ReportWriter::default();

    let data = synthetic::linear_regression(ROWS, 5, 0.5, 7);
    let y = data.target().and_then(Target::as_continuous).expect("targets").clone();
    let options = FitOptions::new("decision_tree").with_param("max_depth", serde_json::json!(6));
    let result = fit_regression(data.features(), &y, "decision_tree", Some(options)).expect("fit");
    c.bench_function("render_regression_report", |b| {
        b.iter(|| {
            writer
                .render(
                    black_box(&result),
                    data.features(),
                    data.target(),
                    TaskType::Regression,
                    data.feature_names(),
                )
                .expect("render")
        });
    });

    let blobs = synthetic::blobs(ROWS, 4, 0.6, 3, 11);
    let options = FitOptions::new("kmeans").with_n_clusters(4);
    let result = fit_clustering(blobs.features(), "kmeans", None, Some(options)).expect("fit");
    c.bench_function("render_clustering_report", |b| {
        b.iter(|| {
            writer
                .render(
                    black_box(&result),
                    blobs.features(),
                    blobs.target(),
                    TaskType::Clustering,
                    blobs.feature_names(),
                )
                .expect("render")
        });
    });
}

criterion_group!(benches, bench_metrics, bench_report_render);
criterion_main!(benches);
