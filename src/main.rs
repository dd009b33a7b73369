//! Example runner: fits each task on synthetic data and writes HTML reports.

use std::path::{Path, PathBuf};

use enginml::config::{self, EngineConfig};
use enginml::{
    Dataset, Engine, EnginError, FitOptions, FitResult, ModelRegistry, ReportWriter, Target,
    TaskType, logging, synthetic,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let runner = Runner::new(config, options.out_dir);
    for task in options.tasks {
        runner.run(task).map_err(|err| format!("{task} example failed: {err}"))?;
    }
    Ok(())
}

struct Runner {
    engine: Engine,
    writer: ReportWriter,
    out_dir: PathBuf,
}

impl Runner {
    fn new(config: EngineConfig, out_dir: PathBuf) -> Self {
        let writer = ReportWriter::new(config.report.clone());
        Self {
            engine: Engine::new(ModelRegistry::builtin(), config),
            writer,
            out_dir,
        }
    }

    fn seed(&self) -> u64 {
        self.engine.config().fit.seed
    }

    fn run(&self, task: TaskType) -> Result<(), EnginError> {
        let (data, options) = match task {
            TaskType::Regression => (
                synthetic::linear_regression(100, 5, 0.1, self.seed()),
                FitOptions::new("random_forest"),
            ),
            TaskType::Classification => {
                (synthetic::iris_like(self.seed()), FitOptions::new("random_forest"))
            }
            TaskType::Clustering => (
                synthetic::blobs(300, 4, 0.6, 2, self.seed()),
                FitOptions::new("kmeans").with_n_clusters(4),
            ),
        };
        println!(
            "== {task}: {} rows x {} features, model `{}`",
            data.n_rows(),
            data.n_features(),
            options.model()
        );
        let result = self.fit(task, &data, options)?;
        print_metrics(&result);
        let path = self.writer.save(
            &result,
            data.features(),
            data.target(),
            task,
            data.feature_names(),
            report_path(&self.out_dir, task),
        )?;
        println!("Report written to {}", path.display());
        Ok(())
    }

    fn fit(
        &self,
        task: TaskType,
        data: &Dataset,
        options: FitOptions,
    ) -> Result<FitResult, EnginError> {
        match (task, data.target()) {
            (TaskType::Clustering, Some(Target::Labels(truth))) => {
                let options = options.with_ground_truth(truth.clone());
                self.engine.fit_clustering(data.features(), &options)
            }
            (_, target) => self.engine.fit(task, data.features(), target, &options),
        }
    }
}

fn print_metrics(result: &FitResult) {
    for (name, value) in result.metrics().iter() {
        println!("  {name:<14} {value:.4}");
    }
}

fn report_path(out_dir: &Path, task: TaskType) -> PathBuf {
    out_dir.join(format!("{task}_report.html"))
}

#[derive(Debug, Clone)]
struct Options {
    out_dir: PathBuf,
    config_path: Option<PathBuf>,
    tasks: Vec<TaskType>,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options {
        out_dir: PathBuf::from("."),
        config_path: None,
        tasks: TaskType::ALL.to_vec(),
    };

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out_dir = PathBuf::from(value);
            }
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--task" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--task requires a value".to_string())?;
                options.tasks = if value == "all" {
                    TaskType::ALL.to_vec()
                } else {
                    vec![value.parse::<TaskType>()?]
                };
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "enginml",
        "",
        "Fit example models on synthetic data and write HTML reports.",
        "",
        "Usage:",
        "  enginml [--out <dir>] [--config <path>] [--task <task>]",
        "",
        "Options:",
        "  --out <dir>       Directory for <task>_report.html files (default: .).",
        "  --config <path>   Config file (default: enginml.toml in the app directory).",
        "  --task <task>     regression, classification, clustering or all (default: all).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn defaults_run_every_task() {
        let options = parse_args(Vec::new()).unwrap().unwrap();
        assert_eq!(options.tasks, TaskType::ALL.to_vec());
        assert_eq!(options.out_dir, PathBuf::from("."));
    }

    #[test]
    fn parses_task_and_out() {
        let options = parse_args(args(&["--task", "clustering", "--out", "reports"]))
            .unwrap()
            .unwrap();
        assert_eq!(options.tasks, vec![TaskType::Clustering]);
        assert_eq!(
            report_path(&options.out_dir, TaskType::Clustering),
            PathBuf::from("reports/clustering_report.html")
        );
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--task", "ranking"])).is_err());
        assert!(parse_args(args(&["--out"])).is_err());
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
    }
}
