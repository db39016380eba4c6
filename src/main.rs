use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use std::path::PathBuf;
use taskboard::config::{self, Backend, Config};
use taskboard::filter::group_by_category;
use taskboard::models::{self, Priority, StatusFilter, Task, TaskDraft, TaskPatch};
use taskboard::storage::Storage;
use taskboard::{Outcome, TaskStore, seed};
use tracing::Level;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Local task board with filtered views, statistics and persistent state")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Data directory (default: platform data dir + /taskboard)
    #[arg(long, env = "TASKBOARD_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/config.yaml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage backend, overriding the config file
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Start from an empty board when no saved state exists
    #[arg(long)]
    no_seed: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task at the top of the board
    Add {
        /// Task title
        #[arg(required = true)]
        title: Vec<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,

        #[arg(short, long, default_value = models::DEFAULT_CATEGORY)]
        category: String,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_due)]
        due: Option<DateTime<Utc>>,

        /// Tag, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Show tasks matching the saved filters, grouped by category
    List {
        /// Ignore the saved filters
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Change fields of a task
    Edit {
        /// Task id or unique prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,

        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(long, value_parser = parse_due, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,

        #[arg(long)]
        clear_due: bool,

        /// Replace the tags, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },

    /// Flip a task between open and done
    Toggle {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task to the position of another task
    Move {
        /// Task to move
        id: String,
        /// Task whose position it takes
        over: String,
    },

    /// Remove every completed task
    ClearCompleted,

    /// Set or clear the saved filters
    Filter {
        /// all, active or completed
        #[arg(short, long, value_parser = parse_status)]
        status: Option<StatusFilter>,

        /// Text matched against titles and tags
        #[arg(long)]
        search: Option<String>,

        #[arg(short, long, conflicts_with = "any_category")]
        category: Option<String>,

        #[arg(long)]
        any_category: bool,

        #[arg(short, long, value_parser = parse_priority, conflicts_with = "any_priority")]
        priority: Option<Priority>,

        #[arg(long)]
        any_priority: bool,

        /// Reset every filter
        #[arg(long)]
        clear: bool,
    },

    /// Show totals, completion rate and tallies
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Toggle between dark and light output
    Theme,
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse::<Priority>().map_err(|e| e.to_string())
}

fn parse_status(s: &str) -> Result<StatusFilter, String> {
    s.parse::<StatusFilter>().map_err(|e| e.to_string())
}

fn parse_due(s: &str) -> Result<DateTime<Utc>, String> {
    models::parse_timestamp(s).ok_or_else(|| format!("Invalid date: {} (expected YYYY-MM-DD or RFC 3339)", s))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => config::default_data_dir()?,
    };

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&data_dir)?,
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.no_seed {
        config.seed = false;
    }

    let storage = config.open_storage(&data_dir)?;
    let fixtures = if config.seed { seed::example_tasks() } else { Vec::new() };
    let mut store = TaskStore::open(storage, fixtures);

    run(&mut store, cli.command)
}

fn run<S: Storage>(store: &mut TaskStore<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            title,
            description,
            priority,
            category,
            due,
            tags,
        } => {
            let mut draft = TaskDraft::new(title.join(" ")).priority(priority).category(category);
            if let Some(description) = description {
                draft = draft.description(description);
            }
            if let Some(due) = due {
                draft = draft.due(due);
            }
            for tag in &tags {
                draft = draft.with_tag(tag);
            }
            let draft = draft.normalized();
            if !draft.is_submittable() {
                return Err(eyre!("Please enter a task title"));
            }

            let id = store.add_task(draft);
            persisted(store)?;
            println!("{} {}", "Task added:".green(), id);
        }

        Commands::List { all, json } => {
            let tasks: Vec<&Task> = if all {
                store.tasks().iter().collect()
            } else {
                store.filtered_tasks()
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                print_tasks(store, &tasks, all);
            }
        }

        Commands::Edit {
            id,
            title,
            description,
            clear_description,
            priority,
            category,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let id = resolve_id(store, &id)?;
            let mut patch = TaskPatch::default();
            if let Some(title) = title {
                let title = title.trim().to_string();
                if title.is_empty() {
                    return Err(eyre!("Please enter a task title"));
                }
                patch = patch.title(title);
            }
            if let Some(description) = description {
                let description = description.trim().to_string();
                patch = patch.description(Some(description).filter(|d| !d.is_empty()));
            } else if clear_description {
                patch = patch.description(None);
            }
            if let Some(priority) = priority {
                patch = patch.priority(priority);
            }
            if let Some(category) = category {
                patch = patch.category(category);
            }
            if let Some(due) = due {
                patch = patch.due_date(Some(due));
            } else if clear_due {
                patch = patch.due_date(None);
            }
            if !tags.is_empty() {
                let deduped = tags.iter().fold(TaskDraft::new(""), |draft, tag| draft.with_tag(tag));
                patch = patch.tags(deduped.tags);
            } else if clear_tags {
                patch = patch.tags(Vec::new());
            }

            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            report(store.update_task(&id, patch), "Task updated", &id);
            persisted(store)?;
        }

        Commands::Toggle { id } => {
            let id = resolve_id(store, &id)?;
            let outcome = store.toggle_task(&id);
            persisted(store)?;
            let done = store.task(&id).is_some_and(|t| t.completed);
            report(outcome, if done { "Task completed" } else { "Task reopened" }, &id);
        }

        Commands::Delete { id } => {
            let id = resolve_id(store, &id)?;
            report(store.delete_task(&id), "Task deleted", &id);
            persisted(store)?;
        }

        Commands::Move { id, over } => {
            let id = resolve_id(store, &id)?;
            let over = resolve_id(store, &over)?;
            report(store.move_task(&id, &over), "Task moved", &id);
            persisted(store)?;
        }

        Commands::ClearCompleted => {
            let removed = store.clear_completed();
            persisted(store)?;
            println!("Removed {} completed task(s)", removed);
        }

        Commands::Filter {
            status,
            search,
            category,
            any_category,
            priority,
            any_priority,
            clear,
        } => {
            if clear {
                store.clear_filters();
            }
            if let Some(status) = status {
                store.set_filter(status);
            }
            if let Some(search) = search {
                store.set_search_query(search);
            }
            if let Some(category) = category {
                store.set_selected_category(Some(category));
            } else if any_category {
                store.set_selected_category(None);
            }
            if let Some(priority) = priority {
                store.set_selected_priority(Some(priority));
            } else if any_priority {
                store.set_selected_priority(None);
            }
            persisted(store)?;
            println!("Filters: {}", store.view());
        }

        Commands::Stats { json } => {
            let stats = store.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total:      {}", stats.total);
                println!("Active:     {}", stats.active);
                println!("Completed:  {}", stats.completed);
                println!("Completion: {:.1}%", stats.completion_rate);
                for priority in Priority::ALL {
                    println!("  {:<8} {}", priority_label(priority), stats.priority_count(priority));
                }
                for (category, count) in &stats.by_category {
                    println!("  {:<8} {}", category, count);
                }
            }
        }

        Commands::Theme => {
            store.toggle_dark_mode();
            persisted(store)?;
            println!("Theme: {}", if store.dark_mode() { "dark" } else { "light" });
        }
    }

    Ok(())
}

/// Surface a snapshot write that failed during the command
fn persisted<S: Storage>(store: &mut TaskStore<S>) -> Result<()> {
    match store.take_persist_error() {
        Some(e) => Err(e.wrap_err("Failed to save task board")),
        None => Ok(()),
    }
}

fn report(outcome: Outcome, message: &str, id: &str) {
    match outcome {
        Outcome::Applied => println!("{} {}", message.green(), id),
        Outcome::NotFound => println!("{} {}", "No change for".yellow(), id),
    }
}

/// Exact id, or the single task whose id starts with `prefix`
fn resolve_id<S: Storage>(store: &TaskStore<S>, prefix: &str) -> Result<String> {
    if store.task(prefix).is_some() {
        return Ok(prefix.to_string());
    }

    let matches: Vec<&Task> = store.tasks().iter().filter(|t| t.id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err(eyre!("No task matches id {}", prefix)),
        many => Err(eyre!("Id prefix {} is ambiguous ({} tasks match)", prefix, many.len())),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::Low => "low".green(),
        Priority::Medium => "medium".yellow(),
        Priority::High => "high".red(),
    }
}

fn print_tasks<S: Storage>(store: &TaskStore<S>, tasks: &[&Task], unfiltered: bool) {
    let dark = store.dark_mode();
    let now = Utc::now();

    if !unfiltered && (store.view().has_active_filters() || store.view().status != StatusFilter::All) {
        println!("{}", format!("Filters: {}", store.view()).dimmed());
    }

    if tasks.is_empty() {
        println!("No tasks found. Create your first task or adjust your filters.");
        return;
    }

    for (category, members) in group_by_category(tasks.iter().copied()) {
        let done = members.iter().filter(|t| t.completed).count();
        println!("{} ({}/{})", category.bold(), done, members.len());

        for task in members {
            let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
            let title = if task.completed {
                task.title.dimmed().strikethrough()
            } else if dark {
                task.title.bright_white()
            } else {
                task.title.black()
            };

            let mut line = format!("  {} {} {}", check, title, priority_label(task.priority));
            if let Some(due) = task.due_date {
                let label = format!("due {}", due.format("%b %-d"));
                let label = if task.is_overdue(now) {
                    format!("{} (overdue)", label).red()
                } else if task.is_due_today(now) {
                    format!("{} (today)", label).yellow()
                } else {
                    label.normal()
                };
                line.push_str(&format!(" {}", label));
            }
            if !task.tags.is_empty() {
                let tags: Vec<String> = task.tags.iter().map(|t| format!("#{}", t)).collect();
                line.push_str(&format!(" {}", tags.join(" ").cyan()));
            }
            println!("{}", line);
            println!("      {}", task.id.dimmed());
            if let Some(description) = &task.description {
                println!("      {}", description.dimmed());
            }
        }
    }
}
