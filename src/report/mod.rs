//! Self-contained HTML report for a [`FitResult`].
//!
//! A report is rendered fully in memory (all validation happens there) and
//! only then written, so a rejected call never touches the filesystem.

mod plots;
mod projection;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use maud::{DOCTYPE, Markup, PreEscaped, html};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::dataset::{self, Target, summarize_features};
use crate::engine::FitResult;
use crate::error::EnginError;
use crate::metrics::{self, ConfusionMatrix};
use crate::task::TaskType;

use plots::PlotSize;

const MIN_PLOT_SIZE: u32 = 200;
const MIN_PLOT_POINTS: usize = 10;
const MIN_BINS: usize = 2;
const MAX_BINS: usize = 100;

const STYLE: &str = "
body {
  font-family: Arial, Helvetica, sans-serif;
  margin: 0 auto; max-width: 1100px; padding: 24px; color: #222;
}
.banner {
  padding: 16px 20px; background: linear-gradient(135deg, #4a90e2, #145da0);
  border-radius: 12px; color: #fff; margin-bottom: 24px;
}
.banner h1 { margin: 0 0 6px 0; font-size: 32px; }
.banner p { margin: 0; opacity: 0.85; }
section { margin-bottom: 32px; }
h2 { border-bottom: 2px solid #ddd; padding-bottom: 4px; }
table { border-collapse: collapse; margin: 8px 0; }
th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
th { background: #f4f6f8; }
td.name, th.name { text-align: left; }
.plots { display: flex; flex-wrap: wrap; gap: 16px; }
.plot { background: #fff; border: 1px solid #e2e2e2; border-radius: 6px; }
.note { font-size: 12px; color: #666; }
";

/// Report layout settings.
///
/// Config keys: `title`, `plot_width`, `plot_height`, `max_plot_points`,
/// `histogram_bins`, `include_timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub title: String,
    pub plot_width: u32,
    pub plot_height: u32,
    /// Upper bound on points drawn per scatter plot.
    pub max_plot_points: usize,
    pub histogram_bins: usize,
    /// Stamp the generation time into the header. Off keeps output reproducible.
    pub include_timestamp: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "EnginML Report".to_string(),
            plot_width: 640,
            plot_height: 420,
            max_plot_points: 2000,
            histogram_bins: 20,
            include_timestamp: false,
        }
    }
}

impl ReportSettings {
    pub(crate) fn normalized(mut self) -> Self {
        self.plot_width = self.plot_width.max(MIN_PLOT_SIZE);
        self.plot_height = self.plot_height.max(MIN_PLOT_SIZE);
        self.max_plot_points = self.max_plot_points.max(MIN_PLOT_POINTS);
        self.histogram_bins = self.histogram_bins.clamp(MIN_BINS, MAX_BINS);
        self
    }

    fn plot_size(&self) -> PlotSize {
        PlotSize {
            width: self.plot_width,
            height: self.plot_height,
        }
    }
}

/// A titled block of report content.
struct ReportSection {
    title: &'static str,
    blocks: Vec<Markup>,
}

impl ReportSection {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            blocks: Vec::new(),
        }
    }

    fn add(&mut self, block: Markup) {
        self.blocks.push(block);
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.blocks {
                    (block)
                }
            }
        }
    }
}

/// Renders and writes reports with fixed [`ReportSettings`].
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    settings: ReportSettings,
}

impl ReportWriter {
    pub fn new(settings: ReportSettings) -> Self {
        Self {
            settings: settings.normalized(),
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Render the report to an HTML string without writing anything.
    pub fn render(
        &self,
        result: &FitResult,
        x: &Array2<f64>,
        y: Option<&Target>,
        task: TaskType,
        feature_names: &[String],
    ) -> Result<String, EnginError> {
        validate(result, x, y, task, feature_names)?;
        let mut sections = vec![self.metrics_section(result)];
        sections.extend(self.diagnostics(result, x.view(), y, feature_names)?);
        sections.push(feature_section(x.view(), feature_names));

        let generated = if self.settings.include_timestamp {
            format_timestamp(OffsetDateTime::now_utc())
        } else {
            None
        };
        let with_plots = task != TaskType::Classification;
        let page = html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.settings.title) }
                    style { (PreEscaped(STYLE)) }
                    @if with_plots {
                        (plots::plotly_js())
                    }
                }
                body {
                    div class="banner" {
                        h1 { (self.settings.title) }
                        p {
                            "Task: " (task.as_str()) " | Model: " (result.model_name())
                            " | Rows: " (x.nrows()) " | Features: " (x.ncols())
                        }
                        @if let Some(generated) = &generated {
                            p class="timestamp" { "Generated " (generated) }
                        }
                    }
                    @for section in &sections {
                        (section.render())
                    }
                }
            }
        };
        Ok(page.into_string())
    }

    /// Render and write the report, returning its absolute path.
    ///
    /// Parent directories are created and an existing file is overwritten.
    pub fn save(
        &self,
        result: &FitResult,
        x: &Array2<f64>,
        y: Option<&Target>,
        task: TaskType,
        feature_names: &[String],
        output_path: impl AsRef<Path>,
    ) -> Result<PathBuf, EnginError> {
        let html = self.render(result, x, y, task, feature_names)?;
        let path = output_path.as_ref();
        let io_err = |source| EnginError::Io {
            path: path.to_path_buf(),
            source,
        };
        let absolute = std::path::absolute(path)
            .map(|absolute| lexically_normalized(&absolute))
            .map_err(io_err)?;
        if let Some(parent) = absolute.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        write_file(&absolute, html.as_bytes()).map_err(io_err)?;
        tracing::info!(
            task = %task,
            model = result.model_name(),
            bytes = html.len(),
            "Report written to {}",
            absolute.display()
        );
        Ok(absolute)
    }

    fn metrics_section(&self, result: &FitResult) -> ReportSection {
        let mut section = ReportSection::new("Metrics");
        section.add(html! {
            table class="metrics" {
                thead { tr { th class="name" { "Metric" } th { "Value" } } }
                tbody {
                    @for (name, value) in result.metrics().iter() {
                        tr { td class="name" { (name) } td { (format!("{value:.4}")) } }
                    }
                }
            }
        });
        section
    }

    fn diagnostics(
        &self,
        result: &FitResult,
        x: ArrayView2<'_, f64>,
        y: Option<&Target>,
        feature_names: &[String],
    ) -> Result<Vec<ReportSection>, EnginError> {
        let predictions = result.predictions();
        match result.task() {
            TaskType::Regression => {
                let actual = y.and_then(Target::as_continuous);
                let predicted = predictions.as_values();
                match (actual, predicted) {
                    (Some(actual), Some(predicted)) => {
                        Ok(vec![self.regression_section(actual.view(), predicted.view())])
                    }
                    _ => Err(EnginError::invalid(
                        "Regression report needs numeric targets and predictions",
                    )),
                }
            }
            TaskType::Classification => {
                let truth = y.and_then(Target::as_labels);
                let predicted = predictions.as_labels();
                match (truth, predicted) {
                    (Some(truth), Some(predicted)) => {
                        classification_section(truth.view(), predicted.view()).map(|s| vec![s])
                    }
                    _ => Err(EnginError::invalid(
                        "Classification report needs true and predicted labels",
                    )),
                }
            }
            TaskType::Clustering => {
                let labels = predictions
                    .as_labels()
                    .ok_or_else(|| EnginError::invalid("Clustering report needs cluster labels"))?;
                let truth = y.and_then(Target::as_labels);
                Ok(vec![self.clustering_section(x, labels, truth, feature_names)])
            }
        }
    }

    fn regression_section(
        &self,
        actual: ArrayView1<'_, f64>,
        predicted: ArrayView1<'_, f64>,
    ) -> ReportSection {
        let residuals: Array1<f64> = &actual - &predicted;
        let mean_residual = residuals.mean().unwrap_or(0.0);
        let max_abs_error = residuals.iter().fold(0.0f64, |acc, r| acc.max(r.abs()));
        let size = self.settings.plot_size();
        let max_points = self.settings.max_plot_points;
        let bins = self.settings.histogram_bins;
        let mut section = ReportSection::new("Diagnostics");
        section.add(html! {
            div class="plots" {
                (plots::predicted_vs_actual(actual, predicted, size, max_points))
                (plots::residual_histogram(residuals.view(), bins, size))
            }
            table class="residuals" {
                tbody {
                    tr {
                        td class="name" { "Mean residual" }
                        td { (format!("{mean_residual:.4}")) }
                    }
                    tr {
                        td class="name" { "Max absolute error" }
                        td { (format!("{max_abs_error:.4}")) }
                    }
                }
            }
        });
        section
    }

    fn clustering_section(
        &self,
        x: ArrayView2<'_, f64>,
        labels: &Array1<usize>,
        truth: Option<&Array1<usize>>,
        feature_names: &[String],
    ) -> ReportSection {
        let projection = projection::project_2d(x, feature_names);
        let sizes = metrics::cluster_sizes(labels.view());
        let total = labels.len().max(1) as f64;
        let mut section = ReportSection::new("Diagnostics");
        section.add(plots::cluster_scatter(
            projection.points.view(),
            labels.view(),
            self.settings.plot_size(),
            self.settings.max_plot_points,
            (&projection.x_label, &projection.y_label),
        ));
        section.add(html! {
            h3 { "Cluster sizes" }
            table class="clusters" {
                thead { tr { th class="name" { "Cluster" } th { "Size" } th { "Share" } } }
                tbody {
                    @for (cluster, size) in &sizes {
                        tr {
                            td class="name" {
                                @let colour = plots::cluster_colour(*cluster);
                                span style=(format!("color: {colour};")) { "\u{25CF} " }
                                (cluster)
                            }
                            td { (size) }
                            td { (format!("{:.1}%", *size as f64 / total * 100.0)) }
                        }
                    }
                }
            }
        });
        if let Some(truth) = truth {
            section.add(contingency_table(truth.view(), labels.view(), &sizes));
        }
        section
    }
}

/// [`ReportWriter::save`] with default settings.
pub fn save_report(
    result: &FitResult,
    x: &Array2<f64>,
    y: Option<&Target>,
    task: TaskType,
    feature_names: &[String],
    output_path: impl AsRef<Path>,
) -> Result<PathBuf, EnginError> {
    ReportWriter::default().save(result, x, y, task, feature_names, output_path)
}

fn validate(
    result: &FitResult,
    x: &Array2<f64>,
    y: Option<&Target>,
    task: TaskType,
    feature_names: &[String],
) -> Result<(), EnginError> {
    dataset::ensure_feature_names(feature_names, x.ncols())?;
    if task != result.task() {
        return Err(EnginError::invalid(format!(
            "Report requested for {task} but the result is from {}",
            result.task()
        )));
    }
    if x.nrows() != result.predictions().len() {
        return Err(EnginError::invalid(format!(
            "Feature matrix has {} rows but the result has {} predictions",
            x.nrows(),
            result.predictions().len()
        )));
    }
    dataset::ensure_finite(x.view())?;
    let expected = match task {
        TaskType::Regression => "continuous",
        TaskType::Classification | TaskType::Clustering => "labels",
    };
    match y {
        None if task.is_supervised() => {
            Err(EnginError::invalid(format!("{task} report requires the target vector")))
        }
        None => Ok(()),
        Some(target) if target.kind() != expected => Err(EnginError::invalid(format!(
            "{task} report needs {expected} targets, got {}",
            target.kind()
        ))),
        Some(target) => dataset::ensure_target_len(target, x.nrows()),
    }
}

fn classification_section(
    truth: ArrayView1<'_, usize>,
    predicted: ArrayView1<'_, usize>,
) -> Result<ReportSection, EnginError> {
    let cm = ConfusionMatrix::from_labels(truth, predicted)?;
    let per_class = metrics::precision_recall_by_class(&cm);
    let mut section = ReportSection::new("Diagnostics");
    section.add(html! {
        h3 { "Confusion matrix" }
        (plots::confusion_heatmap(&cm))
        h3 { "Per-class scores" }
        table class="per-class" {
            thead {
                tr {
                    th class="name" { "Class" }
                    th { "Precision" }
                    th { "Recall" }
                    th { "F1" }
                    th { "Support" }
                }
            }
            tbody {
                @for stats in &per_class {
                    tr {
                        td class="name" { (stats.label) }
                        td { (format!("{:.4}", stats.precision)) }
                        td { (format!("{:.4}", stats.recall)) }
                        td { (format!("{:.4}", stats.f1)) }
                        td { (stats.support) }
                    }
                }
            }
        }
    });
    Ok(section)
}

fn contingency_table(
    truth: ArrayView1<'_, usize>,
    labels: ArrayView1<'_, usize>,
    sizes: &std::collections::BTreeMap<usize, usize>,
) -> Markup {
    let classes = metrics::cluster_sizes(truth);
    let mut counts = std::collections::BTreeMap::new();
    for (&t, &c) in truth.iter().zip(labels.iter()) {
        *counts.entry((t, c)).or_insert(0usize) += 1;
    }
    html! {
        h3 { "Ground truth vs clusters" }
        table class="contingency" {
            thead {
                tr {
                    th class="name" { "truth \\ cluster" }
                    @for cluster in sizes.keys() { th { (cluster) } }
                }
            }
            tbody {
                @for class in classes.keys() {
                    tr {
                        td class="name" { (class) }
                        @for cluster in sizes.keys() {
                            td { (counts.get(&(*class, *cluster)).copied().unwrap_or(0)) }
                        }
                    }
                }
            }
        }
    }
}

fn feature_section(x: ArrayView2<'_, f64>, feature_names: &[String]) -> ReportSection {
    let summaries = summarize_features(x, feature_names);
    let mut section = ReportSection::new("Feature summary");
    section.add(html! {
        table class="features" {
            thead {
                tr {
                    th class="name" { "Feature" }
                    th { "Mean" }
                    th { "Std" }
                    th { "Min" }
                    th { "Max" }
                }
            }
            tbody {
                @for summary in &summaries {
                    tr {
                        td class="name" { (summary.name) }
                        td { (format!("{:.4}", summary.mean)) }
                        td { (format!("{:.4}", summary.std)) }
                        td { (format!("{:.4}", summary.min)) }
                        td { (format!("{:.4}", summary.max)) }
                    }
                }
            }
        }
    });
    section
}

/// Rfc3339 stamp, or `None` (logged) when the offset cannot be expressed.
fn format_timestamp(now: OffsetDateTime) -> Option<String> {
    now.format(&Rfc3339)
        .map_err(|err| tracing::warn!("Report timestamp dropped: {err}"))
        .ok()
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexically_normalized(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Scoped buffered write; the handle is closed when this returns.
fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FitOptions, fit_classification, fit_clustering, fit_regression};
    use ndarray::array;
    use tempfile::tempdir;

    fn names(n: usize) -> Vec<String> {
        dataset::default_feature_names(n)
    }

    fn regression_fixture() -> (Array2<f64>, Array1<f64>, FitResult) {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
        let y = array![1.0, 2.1, 2.9, 4.2, 5.0];
        let result = fit_regression(&x, &y, "linear", None).unwrap();
        (x, y, result)
    }

    #[test]
    fn normalization_clamps_settings() {
        let settings = ReportSettings {
            plot_width: 1,
            histogram_bins: 0,
            max_plot_points: 0,
            ..ReportSettings::default()
        }
        .normalized();
        assert_eq!(settings.plot_width, MIN_PLOT_SIZE);
        assert_eq!(settings.histogram_bins, MIN_BINS);
        assert_eq!(settings.max_plot_points, MIN_PLOT_POINTS);
    }

    #[test]
    fn regression_report_has_plots_and_metrics() {
        let (x, y, result) = regression_fixture();
        let target = Target::Continuous(y);
        let html = ReportWriter::default()
            .render(&result, &x, Some(&target), TaskType::Regression, &names(2))
            .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Predicted vs actual"));
        assert!(html.contains("Max absolute error"));
        let r2 = result.metrics()["r2"];
        assert!(html.contains(&format!("{r2:.4}")));
        assert!(!html.contains("class=\"timestamp\""));
    }

    #[test]
    fn timestamp_only_when_enabled() {
        let (x, y, result) = regression_fixture();
        let target = Target::Continuous(y);
        let writer = ReportWriter::new(ReportSettings {
            include_timestamp: true,
            ..ReportSettings::default()
        });
        let html = writer
            .render(&result, &x, Some(&target), TaskType::Regression, &names(2))
            .unwrap();
        assert!(html.contains("class=\"timestamp\""));
    }

    #[test]
    fn rejects_task_mismatch_and_missing_target() {
        let (x, y, result) = regression_fixture();
        let writer = ReportWriter::default();
        let target = Target::Continuous(y);
        assert!(matches!(
            writer.render(&result, &x, Some(&target), TaskType::Classification, &names(2)),
            Err(EnginError::InvalidInput(_))
        ));
        assert!(matches!(
            writer.render(&result, &x, None, TaskType::Regression, &names(2)),
            Err(EnginError::InvalidInput(_))
        ));
        let labels = Target::Labels(array![0, 1, 0, 1, 0]);
        assert!(matches!(
            writer.render(&result, &x, Some(&labels), TaskType::Regression, &names(2)),
            Err(EnginError::InvalidInput(_))
        ));
    }

    #[test]
    fn classification_report_has_confusion_matrix() {
        let x = array![[0.0], [0.1], [0.2], [5.0], [5.1], [5.2]];
        let y = array![0, 0, 0, 1, 1, 1];
        let result = fit_classification(&x, &y, "decision_tree", None).unwrap();
        let html = ReportWriter::default()
            .render(&result, &x, Some(&Target::Labels(y)), TaskType::Classification, &names(1))
            .unwrap();
        assert!(html.contains("Confusion matrix"));
        assert!(html.contains("Per-class scores"));
    }

    #[test]
    fn clustering_report_lists_sizes_and_contingency() {
        let x = array![[0.0, 0.0], [0.1, 0.2], [0.2, 0.1], [8.0, 8.0], [8.1, 8.2], [8.2, 8.1]];
        let truth = array![0, 0, 0, 1, 1, 1];
        let options = FitOptions::new("kmeans").with_n_clusters(2);
        let result = fit_clustering(&x, "kmeans", None, Some(options)).unwrap();
        let writer = ReportWriter::default();
        let without = writer
            .render(&result, &x, None, TaskType::Clustering, &names(2))
            .unwrap();
        assert!(without.contains("Cluster sizes"));
        assert!(!without.contains("Ground truth vs clusters"));
        let with = writer
            .render(&result, &x, Some(&Target::Labels(truth)), TaskType::Clustering, &names(2))
            .unwrap();
        assert!(with.contains("Ground truth vs clusters"));
    }

    #[test]
    fn timestamp_with_second_offset_is_dropped() {
        let utc = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(format_timestamp(utc).as_deref(), Some("2023-11-14T22:13:20Z"));
        let odd = utc.to_offset(time::UtcOffset::from_hms(1, 0, 30).unwrap());
        assert_eq!(format_timestamp(odd), None);
    }

    #[test]
    fn normalization_collapses_dot_segments() {
        assert_eq!(
            lexically_normalized(Path::new("/out/r.html/../r.html")),
            PathBuf::from("/out/r.html")
        );
        assert_eq!(
            lexically_normalized(Path::new("/out/./a/../../b.html")),
            PathBuf::from("/b.html")
        );
        assert_eq!(lexically_normalized(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn save_resolves_parent_segments_before_creating_dirs() {
        let (x, y, result) = regression_fixture();
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("r.html").join("..").join("r.html");
        let written = save_report(
            &result,
            &x,
            Some(&Target::Continuous(y)),
            TaskType::Regression,
            &names(2),
            &path,
        )
        .unwrap();
        let expected = dir.path().join("out").join("r.html");
        assert_eq!(written, expected);
        assert!(expected.is_file());
    }

    #[test]
    fn save_creates_parent_directories() {
        let (x, y, result) = regression_fixture();
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("report.html");
        let written = save_report(
            &result,
            &x,
            Some(&Target::Continuous(y)),
            TaskType::Regression,
            &names(2),
            &path,
        )
        .unwrap();
        assert!(written.is_absolute());
        assert!(written.ends_with("a/b/report.html"));
        assert!(std::fs::metadata(&written).unwrap().len() > 0);
    }
}
