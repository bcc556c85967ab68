//! Task management commands for CLI.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use focusdeck_core::{Config, NewTask, Priority, TaskDb, TaskFilter, TaskPatch, TaskStore};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Priority: high, medium or low (default: medium)
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Category label
        #[arg(long, default_value = "general")]
        category: String,
        /// Estimated focus units (default: 1)
        #[arg(long, default_value = "1")]
        estimate: u32,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Schedule for today
        #[arg(long)]
        today: bool,
    },
    /// List tasks
    List {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Filter by priority (high, medium or low)
        #[arg(long)]
        priority: Option<String>,
        /// Only tasks scheduled for today
        #[arg(long)]
        today: bool,
        /// Only done tasks
        #[arg(long)]
        done: bool,
        /// Only pending tasks
        #[arg(long)]
        pending: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New priority
        #[arg(long)]
        priority: Option<String>,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// New estimated focus units
        #[arg(long)]
        estimate: Option<u32>,
        /// Set done status
        #[arg(long)]
        done: Option<bool>,
        /// Set today status
        #[arg(long)]
        today: Option<bool>,
        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Toggle the done flag
    Done {
        /// Task ID
        id: String,
    },
    /// Record one completed focus unit
    Credit {
        /// Task ID
        id: String,
    },
    /// Schedule every task of a priority for today
    Today {
        /// Priority to schedule (default: high)
        #[arg(long, default_value = "high")]
        priority: String,
    },
    /// Delete all done tasks
    ClearDone,
    /// Zero completed units and reopen every task
    ResetProgress,
    /// Export tasks as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_priority(raw: &str) -> Priority {
    match raw {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

fn parse_due(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut db = TaskDb::open(config.store_policy())?;

    match action {
        TaskAction::Add {
            title,
            priority,
            category,
            estimate,
            due,
            today,
        } => {
            let new = NewTask {
                title,
                priority: parse_priority(&priority),
                category,
                estimated_units: estimate,
                due_date: match due {
                    Some(ref raw) => Some(parse_due(raw)?),
                    None => None,
                },
                scheduled_today: today,
            };
            let task = db.add(new)?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List {
            category,
            priority,
            today,
            done,
            pending,
        } => {
            let filter = TaskFilter {
                category,
                priority: priority.as_deref().map(parse_priority),
                scheduled_today: today,
                done: if done {
                    Some(true)
                } else if pending {
                    Some(false)
                } else {
                    None
                },
            };
            let tasks = db.list(&filter)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Get { id } => match db.get(&id)? {
            Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
            None => println!("Task not found: {id}"),
        },
        TaskAction::Update {
            id,
            title,
            priority,
            category,
            estimate,
            done,
            today,
            due,
            clear_due,
        } => {
            let patch = TaskPatch {
                title,
                priority: priority.as_deref().map(parse_priority),
                category,
                estimated_units: estimate,
                done,
                scheduled_today: today,
                due_date: if clear_due {
                    Some(None)
                } else {
                    match due {
                        Some(ref raw) => Some(Some(parse_due(raw)?)),
                        None => None,
                    }
                },
            };
            let task = db.update(&id, patch)?;
            println!("Task updated:");
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Delete { id } => {
            db.delete(&id)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Done { id } => {
            let task = db.toggle_done(&id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Credit { id } => {
            let task = db.credit_unit(&id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Today { priority } => {
            let flipped = db.mark_today_by_priority(parse_priority(&priority))?;
            println!("Scheduled {flipped} task(s) for today");
        }
        TaskAction::ClearDone => {
            let removed = db.clear_done()?;
            println!("Removed {removed} done task(s)");
        }
        TaskAction::ResetProgress => {
            db.reset_all_progress()?;
            println!("all progress reset");
        }
        TaskAction::Export { output } => {
            let tasks = db.list(&TaskFilter::default())?;
            match output {
                Some(path) => {
                    let mut wtr = csv::Writer::from_path(&path)?;
                    for task in &tasks {
                        wtr.serialize(task)?;
                    }
                    wtr.flush()?;
                    println!("Exported {} task(s) to {}", tasks.len(), path.display());
                }
                None => {
                    let mut wtr = csv::Writer::from_writer(std::io::stdout());
                    for task in &tasks {
                        wtr.serialize(task)?;
                    }
                    wtr.flush()?;
                }
            }
        }
    }
    Ok(())
}
