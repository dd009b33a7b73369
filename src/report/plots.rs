//! Plotly diagnostics embedded as inline `<div>` and `<script>` blocks.
//!
//! Every plot gets a fixed div id, so the same inputs always render the same
//! bytes.

use std::collections::BTreeMap;

use maud::{Markup, PreEscaped, html};
use ndarray::{ArrayView1, ArrayView2};
use plotly::common::{DashType, Line, Marker, Mode, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Histogram, Plot, Scatter};

use crate::metrics::ConfusionMatrix;

/// Categorical colours for cluster ids; ids beyond the palette wrap around.
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Plot size in pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlotSize {
    pub width: u32,
    pub height: u32,
}

impl PlotSize {
    fn layout(self, title: &str, x_label: &str, y_label: &str) -> Layout {
        Layout::new()
            .title(Title::with_text(title))
            .width(self.width as usize)
            .height(self.height as usize)
            .x_axis(Axis::new().title(Title::with_text(x_label)))
            .y_axis(Axis::new().title(Title::with_text(y_label)))
    }
}

/// Script tags carrying plotly.js, for the document head.
pub(crate) fn plotly_js() -> Markup {
    PreEscaped(Plot::offline_js_sources())
}

/// Indices of at most `max_points` rows, evenly strided from row 0.
pub(crate) fn stride_indices(n: usize, max_points: usize) -> Vec<usize> {
    if n <= max_points || max_points == 0 {
        return (0..n).collect();
    }
    let step = n.div_ceil(max_points);
    (0..n).step_by(step).collect()
}

pub(crate) fn cluster_colour(cluster: usize) -> &'static str {
    PALETTE[cluster % PALETTE.len()]
}

/// Scatter of predicted against actual values with the `y = x` reference line.
pub(crate) fn predicted_vs_actual(
    actual: ArrayView1<'_, f64>,
    predicted: ArrayView1<'_, f64>,
    size: PlotSize,
    max_points: usize,
) -> Markup {
    let shown = stride_indices(actual.len(), max_points);
    let xs: Vec<f64> = shown.iter().map(|&i| actual[i]).collect();
    let ys: Vec<f64> = shown.iter().map(|&i| predicted[i]).collect();
    let (lo, hi) = value_span(actual.iter().chain(predicted.iter()));

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(xs, ys)
            .name("Rows")
            .mode(Mode::Markers)
            .marker(Marker::new().size(6).opacity(0.6).color(PALETTE[0])),
    );
    plot.add_trace(
        Scatter::new(vec![lo, hi], vec![lo, hi])
            .name("Identity")
            .mode(Mode::Lines)
            .line(Line::new().dash(DashType::Dash).color(PALETTE[3])),
    );
    plot.set_layout(size.layout("Predicted vs actual", "Actual", "Predicted"));
    html! {
        (embed(&plot, "predicted-vs-actual"))
        (sampled_note(shown.len(), actual.len()))
    }
}

/// Histogram of residuals with at most `bins` bins.
pub(crate) fn residual_histogram(
    residuals: ArrayView1<'_, f64>,
    bins: usize,
    size: PlotSize,
) -> Markup {
    let mut plot = Plot::new();
    plot.add_trace(
        Histogram::new(residuals.to_vec())
            .name("Residuals")
            .n_bins_x(bins)
            .marker(Marker::new().color("#4a90e2")),
    );
    plot.set_layout(size.layout("Residuals", "Residual (actual - predicted)", "Count"));
    embed(&plot, "residual-histogram")
}

/// 2-D points with one trace per cluster id.
pub(crate) fn cluster_scatter(
    points: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
    size: PlotSize,
    max_points: usize,
    axis_labels: (&str, &str),
) -> Markup {
    let shown = stride_indices(points.nrows(), max_points);
    let mut plot = Plot::new();
    for (cluster, (xs, ys)) in group_by_cluster(points, labels, &shown) {
        plot.add_trace(
            Scatter::new(xs, ys)
                .name(&format!("Cluster {cluster}"))
                .mode(Mode::Markers)
                .marker(Marker::new().size(6).opacity(0.75).color(cluster_colour(cluster))),
        );
    }
    plot.set_layout(size.layout("Clusters", axis_labels.0, axis_labels.1));
    html! {
        (embed(&plot, "cluster-scatter"))
        (sampled_note(shown.len(), points.nrows()))
    }
}

/// Coordinates of the `shown` rows split by cluster, ordered by cluster id.
fn group_by_cluster(
    points: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
    shown: &[usize],
) -> BTreeMap<usize, (Vec<f64>, Vec<f64>)> {
    let mut groups: BTreeMap<usize, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for &i in shown {
        let (xs, ys) = groups.entry(labels[i]).or_default();
        xs.push(points[[i, 0]]);
        ys.push(points[[i, 1]]);
    }
    groups
}

/// Confusion matrix as a table whose cells are shaded by count.
pub(crate) fn confusion_heatmap(cm: &ConfusionMatrix) -> Markup {
    let max = cm.max_count().max(1) as f64;
    html! {
        table class="confusion" {
            thead {
                tr {
                    th { "true \\ predicted" }
                    @for label in &cm.labels { th { (label) } }
                }
            }
            tbody {
                @for (row, truth) in cm.labels.iter().enumerate() {
                    tr {
                        th { (truth) }
                        @for col in 0..cm.n_classes() {
                            @let count = cm.get(row, col);
                            @let alpha = count as f64 / max;
                            td style=(format!(
                                "background-color: rgba(20, 93, 160, {alpha:.3}); color: {};",
                                if alpha > 0.5 { "#fff" } else { "#222" }
                            )) { (count) }
                        }
                    }
                }
            }
        }
    }
}

fn embed(plot: &Plot, div_id: &str) -> Markup {
    html! {
        div class="plot" {
            (PreEscaped(plot.to_inline_html(Some(div_id))))
        }
    }
}

fn value_span<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    if lo.is_finite() && hi.is_finite() {
        (lo, hi)
    } else {
        (0.0, 1.0)
    }
}

fn sampled_note(shown: usize, total: usize) -> Markup {
    html! {
        @if shown < total {
            p class="note" { "Showing " (shown) " of " (total) " points." }
        }
    }
}
