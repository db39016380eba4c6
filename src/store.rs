// Task store: owns the task list and view preferences, persists snapshots

use crate::clock::{self, Clock, SystemClock};
use crate::filter::TaskFilter;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::models::{Priority, StatusFilter, Task, TaskDraft, TaskPatch};
use crate::persist::{self, STORAGE_KEY, StoreState};
use crate::stats::TaskStats;
use crate::storage::Storage;
use eyre::{Result, eyre};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Result of a mutation addressed by task id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    NotFound,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// Handle returned by [`TaskStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreState)>;

/// What the snapshot slot yielded on open
enum Loaded {
    Snapshot(StoreState),
    /// Missing or undecodable; the slot may be replaced
    Vacant,
    /// The read itself failed; the slot must not be touched
    Unreadable,
}

/// Single source of truth for tasks and view preferences.
///
/// Every effective change writes a snapshot to the storage slot (best
/// effort) and then notifies subscribers. No-op calls do neither.
pub struct TaskStore<S: Storage> {
    state: StoreState,
    storage: S,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    persist_error: Option<eyre::Report>,
}

impl<S: Storage> TaskStore<S> {
    /// Open a store on `storage` with the wall clock and UUID ids.
    ///
    /// Rehydrates from the snapshot slot if it holds one; otherwise starts
    /// from `fixtures` and writes the first snapshot. If the slot cannot be
    /// read at all, fixtures are used in memory and the slot is left as is.
    pub fn open(storage: S, fixtures: Vec<TaskDraft>) -> Self {
        Self::open_with(storage, fixtures, Box::new(SystemClock), Box::new(UuidGenerator))
    }

    /// Open with explicit time and id sources
    pub fn open_with(storage: S, fixtures: Vec<TaskDraft>, clock: Box<dyn Clock>, ids: Box<dyn IdGenerator>) -> Self {
        let mut store = Self {
            state: StoreState::default(),
            storage,
            clock,
            ids,
            listeners: Vec::new(),
            next_subscription: 0,
            persist_error: None,
        };

        let writable = match store.load_snapshot() {
            Loaded::Snapshot(state) => {
                info!(tasks = state.tasks.len(), "Rehydrated task store from snapshot");
                store.state = state;
                return store;
            }
            Loaded::Vacant => true,
            Loaded::Unreadable => false,
        };

        info!(fixtures = fixtures.len(), "No snapshot found, seeding task store");
        let now = store.clock.now();
        for draft in fixtures {
            let id = store.fresh_id();
            store.state.tasks.push(Task::from_draft(draft, id, now));
        }
        if writable {
            store.save_best_effort();
        }

        store
    }

    fn load_snapshot(&self) -> Loaded {
        match self.storage.get_item(STORAGE_KEY) {
            Ok(Some(text)) => persist::decode(&text).map_or(Loaded::Vacant, Loaded::Snapshot),
            Ok(None) => Loaded::Vacant,
            Err(e) => {
                warn!(error = %e, "Failed to read snapshot, seeding in memory without writing");
                Loaded::Unreadable
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == id)
    }

    /// Current filter selections
    pub fn view(&self) -> &TaskFilter {
        &self.state.view
    }

    pub fn dark_mode(&self) -> bool {
        self.state.dark_mode
    }

    /// Tasks passing the current filter selections, in list order
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        self.state.view.apply(&self.state.tasks)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::compute(&self.state.tasks)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ========================================================================
    // Task mutations
    // ========================================================================

    /// Insert a new task at the head of the list and return its id
    pub fn add_task(&mut self, draft: TaskDraft) -> String {
        let id = self.fresh_id();
        let now = self.clock.now();
        debug!(id = %id, title = %draft.title, "add_task");
        self.state.tasks.insert(0, Task::from_draft(draft, id.clone(), now));
        self.commit();
        id
    }

    /// Merge `patch` onto the task and refresh its `updated_at`
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Outcome {
        let source = self.clock.as_ref();
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update_task: not found");
            return Outcome::NotFound;
        };

        patch.apply_to(task);
        task.updated_at = clock::next_after(source, task.updated_at);
        debug!(id, "update_task: applied");
        self.commit();
        Outcome::Applied
    }

    pub fn delete_task(&mut self, id: &str) -> Outcome {
        let Some(index) = self.position(id) else {
            debug!(id, "delete_task: not found");
            return Outcome::NotFound;
        };

        self.state.tasks.remove(index);
        debug!(id, "delete_task: applied");
        self.commit();
        Outcome::Applied
    }

    /// Flip `completed` and refresh `updated_at`
    pub fn toggle_task(&mut self, id: &str) -> Outcome {
        let source = self.clock.as_ref();
        let Some(task) = self.state.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle_task: not found");
            return Outcome::NotFound;
        };

        task.completed = !task.completed;
        task.updated_at = clock::next_after(source, task.updated_at);
        debug!(id, completed = task.completed, "toggle_task: applied");
        self.commit();
        Outcome::Applied
    }

    /// Replace the task list with `new_order`.
    ///
    /// `new_order` must hold exactly the current ids, each once. Anything
    /// else is rejected and the list is left as it was.
    pub fn reorder_tasks(&mut self, new_order: Vec<Task>) -> Result<()> {
        if new_order.len() != self.state.tasks.len() {
            return Err(eyre!(
                "Reorder rejected: {} tasks supplied, store holds {}",
                new_order.len(),
                self.state.tasks.len()
            ));
        }

        let current: HashSet<&str> = self.state.tasks.iter().map(|t| t.id.as_str()).collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(new_order.len());
        for task in &new_order {
            if !current.contains(task.id.as_str()) {
                return Err(eyre!("Reorder rejected: unknown task id {}", task.id));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(eyre!("Reorder rejected: duplicate task id {}", task.id));
            }
        }

        debug!(count = new_order.len(), "reorder_tasks: applied");
        self.state.tasks = new_order;
        self.commit();
        Ok(())
    }

    /// Drag-end helper: move `active_id` to the slot currently held by
    /// `over_id`, shifting the tasks in between
    pub fn move_task(&mut self, active_id: &str, over_id: &str) -> Outcome {
        if active_id == over_id {
            return Outcome::NotFound;
        }
        let (Some(from), Some(to)) = (self.position(active_id), self.position(over_id)) else {
            debug!(active_id, over_id, "move_task: not found");
            return Outcome::NotFound;
        };

        let mut new_order = self.state.tasks.clone();
        let task = new_order.remove(from);
        new_order.insert(to, task);

        match self.reorder_tasks(new_order) {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                // A move is a permutation by construction
                warn!(error = %e, "move_task: reorder failed");
                Outcome::NotFound
            }
        }
    }

    /// Remove every completed task and return how many were removed
    pub fn clear_completed(&mut self) -> usize {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|t| !t.completed);
        let removed = before - self.state.tasks.len();

        debug!(removed, "clear_completed");
        if removed > 0 {
            self.commit();
        }
        removed
    }

    // ========================================================================
    // View preferences
    // ========================================================================

    pub fn set_filter(&mut self, status: StatusFilter) {
        if self.state.view.status != status {
            self.state.view.status = status;
            self.commit();
        }
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.state.view.search_query != query {
            self.state.view.search_query = query;
            self.commit();
        }
    }

    pub fn set_selected_category(&mut self, category: Option<String>) {
        if self.state.view.category != category {
            self.state.view.category = category;
            self.commit();
        }
    }

    pub fn set_selected_priority(&mut self, priority: Option<Priority>) {
        if self.state.view.priority != priority {
            self.state.view.priority = priority;
            self.commit();
        }
    }

    /// Reset search, category, priority and status to their defaults
    pub fn clear_filters(&mut self) {
        if self.state.view != TaskFilter::default() {
            self.state.view = TaskFilter::default();
            self.commit();
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.state.dark_mode = !self.state.dark_mode;
        self.commit();
    }

    // ========================================================================
    // Change notification
    // ========================================================================

    /// Call `listener` with the new state after every change
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreState) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the current snapshot, surfacing any storage error.
    ///
    /// Mutations already write on their own; this is for an explicit
    /// flush, e.g. after the storage recovered.
    pub fn save(&mut self) -> Result<()> {
        let text = persist::encode(&self.state)?;
        self.storage.set_item(STORAGE_KEY, &text)
    }

    /// Error from the most recent automatic write, if it failed.
    /// Cleared by taking it or by the next successful write.
    pub fn take_persist_error(&mut self) -> Option<eyre::Report> {
        self.persist_error.take()
    }

    fn save_best_effort(&mut self) {
        match self.save() {
            Ok(()) => self.persist_error = None,
            Err(e) => {
                warn!(error = %e, "Failed to persist task store snapshot, keeping in-memory state");
                self.persist_error = Some(e);
            }
        }
    }

    fn commit(&mut self) {
        self.save_best_effort();
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: &str) -> Option<usize> {
        self.state.tasks.iter().position(|t| t.id == id)
    }

    /// An id from the generator, suffixed if it collides with a stored one
    fn fresh_id(&self) -> String {
        let base = self.ids.next_id();
        if self.position(&base).is_none() {
            return base;
        }

        warn!(id = %base, "Generated id already in use, suffixing");
        let mut attempt = 1u64;
        loop {
            let candidate = format!("{}-{}", base, attempt);
            if self.position(&candidate).is_none() {
                return candidate;
            }
            attempt += 1;
        }
    }
}
