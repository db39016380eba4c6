// Aggregate statistics over the task list

use crate::models::{Priority, Task};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts derived from the full task list.
///
/// Tally maps only carry keys that have at least one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Percentage in `0.0..=100.0`; exactly `0.0` for an empty list
    pub completion_rate: f64,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_category: BTreeMap<String, usize>,
}

impl TaskStats {
    pub fn compute(tasks: &[Task]) -> Self {
        let mut stats = TaskStats {
            total: tasks.len(),
            ..Default::default()
        };

        for task in tasks {
            if task.completed {
                stats.completed += 1;
            }
            *stats.by_priority.entry(task.priority).or_insert(0) += 1;
            *stats.by_category.entry(task.category.clone()).or_insert(0) += 1;
        }

        stats.active = stats.total - stats.completed;
        stats.completion_rate = if stats.total > 0 {
            stats.completed as f64 / stats.total as f64 * 100.0
        } else {
            0.0
        };

        stats
    }

    pub fn priority_count(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }

    pub fn category_count(&self, category: &str) -> usize {
        self.by_category.get(category).copied().unwrap_or(0)
    }
}
