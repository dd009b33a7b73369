use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of learning problem; selects the metric set and report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Regression,
    Classification,
    Clustering,
}

impl TaskType {
    pub const ALL: [TaskType; 3] = [
        TaskType::Regression,
        TaskType::Classification,
        TaskType::Clustering,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Regression => "regression",
            TaskType::Classification => "classification",
            TaskType::Clustering => "clustering",
        }
    }

    /// Whether the task trains against a target vector.
    pub fn is_supervised(self) -> bool {
        !matches!(self, TaskType::Clustering)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regression" => Ok(TaskType::Regression),
            "classification" => Ok(TaskType::Classification),
            "clustering" => Ok(TaskType::Clustering),
            other => Err(format!("Unknown task type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Regression".parse::<TaskType>(), Ok(TaskType::Regression));
        assert_eq!(" clustering ".parse::<TaskType>(), Ok(TaskType::Clustering));
        assert!("ranking".parse::<TaskType>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for task in TaskType::ALL {
            assert_eq!(task.to_string().parse::<TaskType>(), Ok(task));
        }
    }
}
