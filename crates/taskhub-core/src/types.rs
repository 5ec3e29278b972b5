use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TaskhubError;

/// Task parameters: a flat JSON object keyed by parameter name.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Priority of a task. Lower [`rank`](Priority::rank) dequeues first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Highest,
    High,
    #[default]
    Medium,
    Low,
    Lowest,
}

impl Priority {
    /// Numeric rank used for queue ordering: highest = 1 ... lowest = 5.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Highest => 1,
            Priority::High => 2,
            Priority::Medium => 3,
            Priority::Low => 4,
            Priority::Lowest => 5,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Highest => write!(f, "highest"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
            Priority::Lowest => write!(f, "lowest"),
        }
    }
}

impl FromStr for Priority {
    type Err = TaskhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "highest" => Ok(Priority::Highest),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            "lowest" => Ok(Priority::Lowest),
            other => Err(TaskhubError::Config(format!("Unknown priority '{other}'"))),
        }
    }
}

/// Effective execution settings for a routed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub priority: Priority,
    /// Advisory only; the executor never preempts an agent call.
    pub timeout_ms: u64,
    /// Maximum number of attempts the queue makes for the task.
    pub retries: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            priority: Priority::Medium,
            timeout_ms: 60_000,
            retries: 3,
        }
    }
}

/// Shallow merge: every key in `overrides` replaces the key in `base`.
///
/// Nested objects are replaced wholesale, never merged.
pub fn merge_parameters(mut base: Parameters, overrides: Parameters) -> Parameters {
    for (key, value) in overrides {
        base.insert(key, value);
    }
    base
}
