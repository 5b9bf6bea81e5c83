use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    Completed,
    Pending,
}

impl FilterMode {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Completed => task.completed,
            FilterMode::Pending => !task.completed,
        }
    }
}

impl FromStr for FilterMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "completed" | "done" => Ok(FilterMode::Completed),
            "pending" => Ok(FilterMode::Pending),
            other => Err(anyhow!(
                "unknown filter '{other}', expected all, completed or pending"
            )),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterMode::All => "all",
            FilterMode::Completed => "completed",
            FilterMode::Pending => "pending",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

pub fn filter(tasks: &[Task], mode: FilterMode) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| mode.matches(task))
        .cloned()
        .collect()
}

/// Newest first. Equal creation instants fall back to the larger id first so
/// the order never depends on the input order.
pub fn sort(tasks: &[Task]) -> Vec<Task> {
    let mut rows = tasks.to_vec();
    rows.sort_by_key(|task| Reverse((task.created_at, task.id)));
    rows
}

pub fn stats(tasks: &[Task]) -> Stats {
    let completed = tasks.iter().filter(|task| task.completed).count();
    Stats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
    }
}

/// What the task list shows for `mode`: filtered, then sorted.
pub fn visible(tasks: &[Task], mode: FilterMode) -> Vec<Task> {
    sort(&filter(tasks, mode))
}
