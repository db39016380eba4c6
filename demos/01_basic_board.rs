//! Example 01: Basic Board
//!
//! This example demonstrates adding, editing, toggling and deleting tasks,
//! and reopening the board from its saved snapshot.
//!
//! Run with: cargo run --example 01_basic_board

use eyre::Result;
use taskboard::{FileStorage, Outcome, TaskDraft, TaskPatch, TaskStore, seed};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_path_buf();

    println!("Taskboard Basic Example");
    println!("=======================\n");
    println!("Data dir: {}\n", data_dir.display());

    // First open: no snapshot yet, so the example tasks are seeded
    let mut store = TaskStore::open(FileStorage::open(&data_dir)?, seed::example_tasks());
    println!("1. SEED - {} example tasks on a fresh board", store.tasks().len());

    // CREATE
    let id = store.add_task(
        TaskDraft::new("Call the plumber")
            .category("Personal")
            .with_tag("home")
            .with_tag("urgent"),
    );
    println!("2. ADD - created {} at the top: {:?}\n", id, store.tasks()[0].title);

    // UPDATE
    let outcome = store.update_task(&id, TaskPatch::default().title("Call the plumber about the sink"));
    println!("3. UPDATE - {:?}", outcome);
    println!("   Title now: {}\n", store.task(&id).map(|t| t.title.as_str()).unwrap_or("?"));

    // TOGGLE
    store.toggle_task(&id);
    println!("4. TOGGLE - completed = {}\n", store.task(&id).is_some_and(|t| t.completed));

    // Ids that do not exist are reported, not errors
    assert_eq!(store.delete_task("no-such-task"), Outcome::NotFound);
    println!("5. DELETE missing id - NotFound, nothing changed\n");

    // Reopen from disk: the snapshot wins over the fixtures
    let before = store.state().clone();
    drop(store);
    let reopened = TaskStore::open(FileStorage::open(&data_dir)?, seed::example_tasks());
    println!("6. REOPEN - {} tasks restored", reopened.tasks().len());
    assert_eq!(reopened.state(), &before);
    println!("   State identical after reopen.");

    Ok(())
}
