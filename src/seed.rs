// First-run example tasks

use crate::models::{Priority, TaskDraft};

/// Tasks shown on a fresh board so it is never empty on first load
pub fn example_tasks() -> Vec<TaskDraft> {
    vec![
        TaskDraft::new("Plan the week")
            .description("Block out focus time and review upcoming deadlines")
            .priority(Priority::High)
            .category("Work")
            .with_tag("planning"),
        TaskDraft::new("Buy groceries")
            .description("Milk, eggs, bread, and fresh vegetables")
            .priority(Priority::Medium)
            .category("Shopping")
            .with_tag("errands"),
        TaskDraft::new("Morning run")
            .priority(Priority::Low)
            .category("Health")
            .with_tag("exercise"),
        TaskDraft::new("Read a chapter of a Rust book")
            .priority(Priority::Medium)
            .category("Learning")
            .with_tag("reading")
            .with_tag("rust"),
        TaskDraft::new("Set up the task board")
            .completed(true)
            .priority(Priority::Low)
            .category("Personal"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CATEGORIES;

    #[test]
    fn test_examples_are_submittable() {
        let examples = example_tasks();
        assert!(!examples.is_empty());
        for draft in &examples {
            assert!(draft.is_submittable());
            assert!(CATEGORIES.contains(&draft.category.as_str()));
        }
    }

    #[test]
    fn test_examples_mix_completion() {
        let examples = example_tasks();
        assert!(examples.iter().any(|d| d.completed));
        assert!(examples.iter().any(|d| !d.completed));
    }
}
