// Taskboard - task store with filtered views, statistics and key-value persistence

pub mod clock;
pub mod config;
pub mod filter;
pub mod ids;
pub mod models;
pub mod persist;
pub mod seed;
pub mod stats;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use filter::TaskFilter;
pub use models::{Priority, StatusFilter, Task, TaskDraft, TaskPatch};
pub use persist::{STORAGE_KEY, StoreState};
pub use stats::TaskStats;
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
pub use store::{Outcome, SubscriptionId, TaskStore};
