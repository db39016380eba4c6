//! Example 02: Filters and Statistics
//!
//! This example demonstrates the filtered view, category grouping, the
//! statistics derivation and change subscriptions.
//!
//! Run with: cargo run --example 02_filters_and_stats

use std::cell::Cell;
use std::rc::Rc;
use taskboard::filter::group_by_category;
use taskboard::{MemoryStorage, Priority, StatusFilter, TaskDraft, TaskStore};

fn main() {
    println!("Taskboard Filters Example");
    println!("=========================\n");

    let mut store = TaskStore::open(MemoryStorage::new(), Vec::new());

    let changes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changes);
    store.subscribe(move |_| counter.set(counter.get() + 1));

    store.add_task(TaskDraft::new("Quarterly report").priority(Priority::High).category("Work"));
    store.add_task(TaskDraft::new("Client meeting").priority(Priority::High).category("Work").with_tag("client"));
    store.add_task(TaskDraft::new("Buy groceries").category("Shopping").completed(true));
    store.add_task(TaskDraft::new("Yoga class").priority(Priority::Low).category("Health"));

    println!("All tasks grouped by category:");
    for (category, tasks) in group_by_category(store.tasks()) {
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        println!("  {}: {:?}", category, titles);
    }

    store.set_filter(StatusFilter::Active);
    store.set_selected_priority(Some(Priority::High));
    println!("\nActive, high priority ({}):", store.view());
    for task in store.filtered_tasks() {
        println!("  - {}", task.title);
    }

    store.clear_filters();
    store.set_search_query("CLIENT");
    println!("\nSearch matches tags too ({}):", store.view());
    for task in store.filtered_tasks() {
        println!("  - {} {:?}", task.title, task.tags);
    }

    let stats = store.stats();
    println!("\nStatistics:");
    println!("  total={} completed={} active={}", stats.total, stats.completed, stats.active);
    println!("  completion rate {:.1}%", stats.completion_rate);
    println!("  by priority {:?}", stats.by_priority);
    println!("  by category {:?}", stats.by_category);

    println!("\nSubscribers saw {} changes.", changes.get());
}
