// Filtered-view derivation over the task list

use crate::models::{Priority, StatusFilter, Task};
use serde::{Deserialize, Serialize};

/// The view-narrowing selections held by the store.
///
/// Every active condition must pass for a task to be included; list order
/// is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilter {
    /// Completion-status selector
    #[serde(rename = "filter")]
    pub status: StatusFilter,
    /// Case-insensitive text matched against titles and tags
    #[serde(rename = "searchQuery")]
    pub search_query: String,
    /// Exact category match when set
    #[serde(rename = "selectedCategory")]
    pub category: Option<String>,
    /// Exact priority match when set
    #[serde(rename = "selectedPriority")]
    pub priority: Option<Priority>,
}

impl TaskFilter {
    /// True if `task` passes every active condition
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_with(task, &self.search_query.to_lowercase())
    }

    fn matches_with(&self, task: &Task, needle: &str) -> bool {
        match self.status {
            StatusFilter::Active if task.completed => return false,
            StatusFilter::Completed if !task.completed => return false,
            _ => {}
        }

        if !needle.is_empty() && !task.matches_search(needle) {
            return false;
        }

        if let Some(category) = &self.category
            && task.category != *category
        {
            return false;
        }

        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }

        true
    }

    /// Tasks passing the filter, in their original relative order
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let needle = self.search_query.to_lowercase();
        tasks.iter().filter(|task| self.matches_with(task, &needle)).collect()
    }

    /// Search, category or priority narrowing is in effect.
    /// The status selector is not counted.
    pub fn has_active_filters(&self) -> bool {
        !self.search_query.is_empty() || self.category.is_some() || self.priority.is_some()
    }
}

impl std::fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status={}", self.status)?;
        if !self.search_query.is_empty() {
            write!(f, " search={:?}", self.search_query)?;
        }
        if let Some(category) = &self.category {
            write!(f, " category={}", category)?;
        }
        if let Some(priority) = self.priority {
            write!(f, " priority={}", priority)?;
        }
        Ok(())
    }
}

/// Group tasks by category. Groups appear in order of first occurrence and
/// tasks keep their relative order inside a group.
pub fn group_by_category<'a, I>(tasks: I) -> Vec<(&'a str, Vec<&'a Task>)>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut groups: Vec<(&'a str, Vec<&'a Task>)> = Vec::new();
    for task in tasks {
        match groups.iter_mut().find(|(category, _)| *category == task.category) {
            Some((_, members)) => members.push(task),
            None => groups.push((task.category.as_str(), vec![task])),
        }
    }
    groups
}
