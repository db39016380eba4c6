// Data models for the task board

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Category labels offered by the entry form
pub const CATEGORIES: [&str; 5] = ["Work", "Personal", "Shopping", "Health", "Learning"];

/// Category used when the producer does not pick one
pub const DEFAULT_CATEGORY: &str = "Personal";

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_optional_timestamp"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "de_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from a draft with the identity fields filled in
    pub fn from_draft(draft: TaskDraft, id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            completed: draft.completed,
            priority: draft.priority,
            category: draft.category,
            due_date: draft.due_date,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Due date has passed and the task is still open
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }

    /// Due date falls on the same (UTC) calendar day as `now`
    pub fn is_due_today(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due.date_naive() == now.date_naive())
    }

    /// Case-insensitive substring match against the title or any tag.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(eyre::eyre!("Unknown priority: {} (expected low, medium or high)", other)),
        }
    }
}

/// Completion-status selector of the filtered view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(eyre::eyre!("Unknown status filter: {} (expected all, active or completed)", other)),
        }
    }
}

/// Everything a new task needs except its identity and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub category: String,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            completed: false,
            priority: Priority::default(),
            category: default_category(),
            due_date: None,
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Append a tag unless it is blank or already present
    pub fn with_tag(mut self, tag: &str) -> Self {
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
        self
    }

    /// Trim the title and description; a blank description becomes `None`
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }

    /// The entry form refuses drafts whose title is blank
    pub fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Partial update for an existing task.
///
/// `None` leaves a field alone. For the optional task fields the inner
/// `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Merge onto `task`. Identity fields and timestamps are untouched.
    pub(crate) fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
    }
}

/// Parse a stored timestamp: RFC 3339 text, a bare `YYYY-MM-DD` date
/// (midnight UTC), or epoch milliseconds
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    text.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn resolve(self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms),
            RawTimestamp::Text(text) => parse_timestamp(&text),
        }
    }
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?
        .resolve()
        .ok_or_else(|| serde::de::Error::custom("invalid timestamp"))
}

fn de_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => raw
            .resolve()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("invalid due date")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        Task::from_draft(
            TaskDraft::new("Write report").category("Work").with_tag("q1"),
            "task-1".to_string(),
            now,
        )
    }

    #[test]
    fn test_priority_serialization() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"low\"");
        let parsed: Priority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Priority::Medium);
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_status_filter_from_str() {
        assert_eq!("active".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
        assert_eq!(StatusFilter::default(), StatusFilter::All);
        assert!("done".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = sample_task();
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("dueDate").is_none());
        assert!(json.get("description").is_none());
        assert_eq!(json["createdAt"], "2025-03-14T09:30:00Z");
    }

    #[test]
    fn test_task_dates_from_string_and_millis() {
        let json = r#"{
            "id": "a",
            "title": "Dated",
            "priority": "low",
            "category": "Work",
            "dueDate": "2025-04-01",
            "tags": [],
            "createdAt": 1741944600000,
            "updatedAt": "2025-03-14T09:30:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        assert_eq!(task.created_at, expected);
        assert_eq!(task.updated_at, expected);
        assert_eq!(task.due_date, Some(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()));
        assert!(!task.completed);
    }

    #[test]
    fn test_task_rejects_garbage_timestamp() {
        let json = r#"{"id":"a","title":"x","createdAt":"yesterday","updatedAt":"yesterday"}"#;
        assert!(serde_json::from_str::<Task>(json).is_err());
    }

    #[test]
    fn test_draft_with_tag_dedups_and_trims() {
        let draft = TaskDraft::new("t").with_tag(" urgent ").with_tag("urgent").with_tag("  ").with_tag("client");
        assert_eq!(draft.tags, vec!["urgent".to_string(), "client".to_string()]);
    }

    #[test]
    fn test_draft_normalized() {
        let draft = TaskDraft::new("  Buy milk ").description("   ").normalized();
        assert_eq!(draft.title, "Buy milk");
        assert_eq!(draft.description, None);
        assert!(draft.is_submittable());
        assert!(!TaskDraft::new("   ").is_submittable());
    }

    #[test]
    fn test_patch_apply_keeps_identity() {
        let mut task = sample_task();
        let before = task.clone();
        TaskPatch::default()
            .title("Renamed")
            .description(Some("details".to_string()))
            .apply_to(&mut task);
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.description.as_deref(), Some("details"));
        assert_eq!(task.id, before.id);
        assert_eq!(task.created_at, before.created_at);
        assert_eq!(task.updated_at, before.updated_at);
        assert_eq!(task.tags, before.tags);
    }

    #[test]
    fn test_patch_can_clear_due_date() {
        let mut task = sample_task();
        task.due_date = Some(task.created_at);
        TaskPatch::default().due_date(None).apply_to(&mut task);
        assert_eq!(task.due_date, None);
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn test_overdue_and_due_today() {
        let mut task = sample_task();
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        assert!(!task.is_overdue(now));

        task.due_date = Some(Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap());
        assert!(task.is_overdue(now));
        assert!(task.is_due_today(now));

        task.completed = true;
        assert!(!task.is_overdue(now));

        task.due_date = Some(Utc.with_ymd_and_hms(2025, 3, 21, 8, 0, 0).unwrap());
        assert!(!task.is_due_today(now));
    }

    #[test]
    fn test_search_matches_title_and_tags() {
        let task = sample_task();
        assert!(task.matches_search("report"));
        assert!(task.matches_search("q1"));
        assert!(!task.matches_search("groceries"));
    }
}
