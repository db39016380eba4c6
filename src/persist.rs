// Snapshot encoding and lenient rehydration

use crate::filter::TaskFilter;
use crate::models::Task;
use eyre::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Storage slot holding the store snapshot
pub const STORAGE_KEY: &str = "task-manager-storage";

/// Version written into the snapshot envelope
pub const SNAPSHOT_VERSION: u32 = 0;

/// Full store state: the task list plus view preferences
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub tasks: Vec<Task>,
    #[serde(flatten)]
    pub view: TaskFilter,
    pub dark_mode: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            view: TaskFilter::default(),
            dark_mode: true,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    state: &'a StoreState,
    version: u32,
}

/// Serialize the state inside the `{"state": ..., "version": N}` envelope
pub fn encode(state: &StoreState) -> Result<String> {
    serde_json::to_string(&Envelope {
        state,
        version: SNAPSHOT_VERSION,
    })
    .context("Failed to serialize store snapshot")
}

/// Rebuild state from a snapshot.
///
/// Accepts the envelope or a bare state object. Missing or malformed fields
/// fall back to their defaults one at a time and malformed tasks are
/// skipped. Returns `None` only when the text is not a JSON object at all.
pub fn decode(text: &str) -> Option<StoreState> {
    let root: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Snapshot is not valid JSON, ignoring it");
            return None;
        }
    };

    let Value::Object(mut root) = root else {
        warn!("Snapshot is not a JSON object, ignoring it");
        return None;
    };

    if let Some(version) = root.get("version").and_then(Value::as_u64)
        && version != u64::from(SNAPSHOT_VERSION)
    {
        warn!(version, expected = SNAPSHOT_VERSION, "Snapshot version differs, reading what fits");
    }

    let mut fields = match root.remove("state") {
        Some(Value::Object(state)) => state,
        _ => root,
    };

    let defaults = StoreState::default();
    let state = StoreState {
        tasks: decode_tasks(fields.remove("tasks")),
        view: TaskFilter {
            status: field_or(&mut fields, "filter", defaults.view.status),
            search_query: field_or(&mut fields, "searchQuery", defaults.view.search_query),
            category: field_or(&mut fields, "selectedCategory", defaults.view.category),
            priority: field_or(&mut fields, "selectedPriority", defaults.view.priority),
        },
        dark_mode: field_or(&mut fields, "darkMode", defaults.dark_mode),
    };

    debug!(tasks = state.tasks.len(), "Decoded store snapshot");
    Some(state)
}

fn field_or<T: DeserializeOwned>(fields: &mut Map<String, Value>, name: &str, default: T) -> T {
    match fields.remove(name) {
        None => default,
        Some(value) => match serde_json::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(field = name, error = %e, "Malformed snapshot field, using default");
                default
            }
        },
    }
}

fn decode_tasks(value: Option<Value>) -> Vec<Task> {
    let items = match value {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!("Snapshot tasks is not an array, starting with no tasks");
            return Vec::new();
        }
    };

    let mut tasks: Vec<Task> = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let mut task: Task = match serde_json::from_value(item) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = %e, "Failed to parse task, skipping");
                continue;
            }
        };

        if task.updated_at < task.created_at {
            warn!(index, id = %task.id, "Task updatedAt precedes createdAt, clamping");
            task.updated_at = task.created_at;
        }

        // Ids must stay unique; the first occurrence wins
        if tasks.iter().any(|t| t.id == task.id) {
            warn!(index, id = %task.id, "Duplicate task id in snapshot, skipping");
            continue;
        }
        tasks.push(task);
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, StatusFilter, TaskDraft};
    use chrono::{Duration, TimeZone, Utc};

    fn sample_state() -> StoreState {
        let created = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();
        let mut done = Task::from_draft(
            TaskDraft::new("Ship release")
                .description("tag and publish")
                .priority(Priority::High)
                .category("Work")
                .due(created + Duration::days(3))
                .with_tag("release")
                .with_tag("v1"),
            "t-1".to_string(),
            created,
        );
        done.completed = true;
        done.updated_at = created + Duration::milliseconds(1500);

        let open = Task::from_draft(TaskDraft::new("Buy milk").category("Shopping"), "t-2".to_string(), created);

        StoreState {
            tasks: vec![done, open],
            view: TaskFilter {
                status: StatusFilter::Active,
                search_query: "milk".to_string(),
                category: Some("Shopping".to_string()),
                priority: Some(Priority::Low),
            },
            dark_mode: false,
        }
    }

    #[test]
    fn test_default_state() {
        let state = StoreState::default();
        assert!(state.tasks.is_empty());
        assert_eq!(state.view, TaskFilter::default());
        assert!(state.dark_mode);
    }

    #[test]
    fn test_encode_layout() {
        let json: Value = serde_json::from_str(&encode(&sample_state()).unwrap()).unwrap();
        assert_eq!(json["version"], 0);
        let state = &json["state"];
        assert_eq!(state["filter"], "active");
        assert_eq!(state["searchQuery"], "milk");
        assert_eq!(state["selectedCategory"], "Shopping");
        assert_eq!(state["selectedPriority"], "low");
        assert_eq!(state["darkMode"], false);
        assert_eq!(state["tasks"][0]["dueDate"], "2025-02-04T08:00:00Z");
        assert_eq!(state["tasks"][0]["updatedAt"], "2025-02-01T08:00:01.500Z");
    }

    #[test]
    fn test_round_trip() {
        let state = sample_state();
        let restored = decode(&encode(&state).unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_decode_bare_state_and_defaults() {
        let restored = decode(r#"{"tasks": []}"#).unwrap();
        assert_eq!(restored, StoreState::default());

        let restored = decode("{}").unwrap();
        assert!(restored.dark_mode);
    }

    #[test]
    fn test_decode_bad_field_resets_only_that_field() {
        let mut state = sample_state();
        let mut json: Value = serde_json::from_str(&encode(&state).unwrap()).unwrap();
        json["state"]["filter"] = Value::String("someday".to_string());
        json["state"]["darkMode"] = Value::String("yes".to_string());

        let restored = decode(&json.to_string()).unwrap();
        state.view.status = StatusFilter::All;
        state.dark_mode = true;
        assert_eq!(restored, state);
    }

    #[test]
    fn test_decode_skips_malformed_and_duplicate_tasks() {
        let text = r#"{"state": {"tasks": [
            {"id": "a", "title": "good", "createdAt": "2025-01-01T00:00:00Z", "updatedAt": 1735689600000},
            {"id": "b", "title": "no dates"},
            "not a task",
            {"id": "a", "title": "dup", "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-01-01T00:00:00Z"}
        ]}}"#;
        let restored = decode(text).unwrap();
        assert_eq!(restored.tasks.len(), 1);
        assert_eq!(restored.tasks[0].title, "good");
        assert_eq!(restored.tasks[0].updated_at, restored.tasks[0].created_at);
        assert_eq!(restored.tasks[0].category, "Personal");
        assert_eq!(restored.tasks[0].priority, Priority::Medium);
    }

    #[test]
    fn test_decode_clamps_updated_before_created() {
        let text = r#"{"tasks": [
            {"id": "a", "title": "skewed", "createdAt": "2025-03-01T00:00:00Z", "updatedAt": "2025-01-01T00:00:00Z"},
            {"id": "b", "title": "fine", "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-03-01T00:00:00Z"}
        ]}"#;
        let restored = decode(text).unwrap();
        let march = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(restored.tasks[0].created_at, march);
        assert_eq!(restored.tasks[0].updated_at, march);
        assert_eq!(restored.tasks[1].updated_at, march);
        assert!(restored.tasks[1].created_at < march);
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(decode("not json").is_none());
        assert!(decode("[1, 2, 3]").is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn test_decode_tasks_not_array() {
        let restored = decode(r#"{"state": {"tasks": {"id": "a"}, "darkMode": false}}"#).unwrap();
        assert!(restored.tasks.is_empty());
        assert!(!restored.dark_mode);
    }
}
