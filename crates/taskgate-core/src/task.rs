use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::iso_instant;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Important,
    #[default]
    Medium,
    Least,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Important => "important",
            Priority::Medium => "medium",
            Priority::Least => "least",
        }
    }

    /// Label shown in task tables.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Important => "Important",
            Priority::Medium => "Medium",
            Priority::Least => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "important" | "h" | "high" => Ok(Priority::Important),
            "medium" | "m" => Ok(Priority::Medium),
            "least" | "l" | "low" => Ok(Priority::Least),
            other => Err(anyhow!(
                "invalid priority '{other}', expected important, medium or least"
            )),
        }
    }
}

/// Target state for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn is_completed(self) -> bool {
        self == TaskStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,

    pub title: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(with = "iso_instant")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        }
    }
}
