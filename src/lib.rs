//! Fit regression, classification and clustering models on in-memory data and
//! render the results as a self-contained HTML report.
//!
//! ```no_run
//! use enginml::{TaskType, Target, fit_regression, save_report, synthetic};
//!
//! let data = synthetic::linear_regression(100, 5, 0.1, 42);
//! let y = data.target().and_then(Target::as_continuous).unwrap().clone();
//! let result = fit_regression(data.features(), &y, "random_forest", None)?;
//! let path = save_report(
//!     &result,
//!     data.features(),
//!     data.target(),
//!     TaskType::Regression,
//!     data.feature_names(),
//!     "regression_report.html",
//! )?;
//! println!("{}", path.display());
//! # Ok::<(), enginml::EnginError>(())
//! ```

/// Application directory resolution.
pub mod app_dirs;
/// TOML configuration.
pub mod config;
/// In-memory datasets and feature summaries.
pub mod dataset;
/// The fit facade.
pub mod engine;
pub mod error;
/// Tracing setup for the binary.
pub mod logging;
pub mod metrics;
pub mod models;
pub mod report;
/// Seeded synthetic datasets.
pub mod synthetic;
pub mod task;

pub use dataset::{Dataset, Predictions, Target};
pub use engine::{
    Engine, FitOptions, FitResult, ModelHandle, fit_classification, fit_clustering,
    fit_regression,
};
pub use error::EnginError;
pub use metrics::{Metrics, evaluate};
pub use models::ModelRegistry;
pub use report::{ReportSettings, ReportWriter, save_report};
pub use task::TaskType;
