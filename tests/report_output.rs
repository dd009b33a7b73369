use enginml::{
    EnginError, FitOptions, ReportSettings, ReportWriter, Target, TaskType, fit_clustering,
    fit_regression, save_report, synthetic,
};
use tempfile::tempdir;

fn regression_run() -> (enginml::Dataset, enginml::FitResult) {
    let data = synthetic::linear_regression(100, 5, 0.1, 42);
    let y = data.target().and_then(Target::as_continuous).unwrap().clone();
    let options = FitOptions::new("random_forest").with_param("n_trees", serde_json::json!(30));
    let result = fit_regression(data.features(), &y, "random_forest", Some(options)).unwrap();
    (data, result)
}

#[test]
fn wrong_feature_name_count_writes_nothing() {
    let (data, result) = regression_run();
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("report.html");
    let names = vec!["only_one".to_string()];
    let err = save_report(
        &result,
        data.features(),
        data.target(),
        TaskType::Regression,
        &names,
        &path,
    )
    .unwrap_err();
    assert!(matches!(err, EnginError::InvalidInput(_)));
    assert!(!path.exists());
    assert!(!dir.path().join("nested").exists());
}

#[test]
fn report_contains_every_metric_with_four_decimals() {
    let (data, result) = regression_run();
    let dir = tempdir().unwrap();
    let path = save_report(
        &result,
        data.features(),
        data.target(),
        TaskType::Regression,
        data.feature_names(),
        dir.path().join("regression_report.html"),
    )
    .unwrap();
    assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("html"));
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(!html.is_empty());
    for (name, value) in result.metrics().iter() {
        assert!(html.contains(name), "missing metric name {name}");
        assert!(html.contains(&format!("{value:.4}")), "missing value for {name}");
    }
    for name in data.feature_names() {
        assert!(html.contains(name.as_str()));
    }
    assert!(html.contains("random_forest"));
}

#[test]
fn identical_inputs_produce_identical_bytes() {
    let (data, result) = regression_run();
    let dir = tempdir().unwrap();
    let first = save_report(
        &result,
        data.features(),
        data.target(),
        TaskType::Regression,
        data.feature_names(),
        dir.path().join("a.html"),
    )
    .unwrap();
    let second = save_report(
        &result,
        data.features(),
        data.target(),
        TaskType::Regression,
        data.feature_names(),
        dir.path().join("b.html"),
    )
    .unwrap();
    assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
}

#[test]
fn unwritable_target_is_an_io_error() {
    let (data, result) = regression_run();
    let dir = tempdir().unwrap();
    let err = save_report(
        &result,
        data.features(),
        data.target(),
        TaskType::Regression,
        data.feature_names(),
        dir.path(),
    )
    .unwrap_err();
    match err {
        EnginError::Io { path, .. } => assert_eq!(path, dir.path()),
        other => panic!("expected an IO error, got {other}"),
    }
}

#[test]
fn existing_report_is_overwritten() {
    let (data, result) = regression_run();
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.html");
    std::fs::write(&path, "stale").unwrap();
    save_report(
        &result,
        data.features(),
        data.target(),
        TaskType::Regression,
        data.feature_names(),
        &path,
    )
    .unwrap();
    let expected = ReportWriter::default()
        .render(
            &result,
            data.features(),
            data.target(),
            TaskType::Regression,
            data.feature_names(),
        )
        .unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);
}

#[test]
fn clustering_report_samples_points_and_uses_custom_title() {
    let data = synthetic::blobs(300, 4, 0.6, 3, 42);
    let options = FitOptions::new("kmeans").with_n_clusters(4);
    let result = fit_clustering(data.features(), "kmeans", None, Some(options)).unwrap();
    let writer = ReportWriter::new(ReportSettings {
        title: "Blob check".to_string(),
        max_plot_points: 100,
        ..ReportSettings::default()
    });
    let dir = tempdir().unwrap();
    let path = writer
        .save(
            &result,
            data.features(),
            data.target(),
            TaskType::Clustering,
            data.feature_names(),
            dir.path().join("clustering_report.html"),
        )
        .unwrap();
    let html = std::fs::read_to_string(path).unwrap();
    assert!(html.contains("<title>Blob check</title>"));
    assert!(html.contains("Showing 100 of 300 points."));
    assert!(html.contains("Ground truth vs clusters"));
}
