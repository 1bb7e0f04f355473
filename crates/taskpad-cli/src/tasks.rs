use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use taskpad_core::{
    id::UuidIds,
    scheduler::NoopScheduler,
    tasks::{Task, TaskDraft, TaskFilter, TaskPatch, TaskPriority, TaskStatus},
};
use taskpad_store::{Mutation, TaskStore};
use tracing::warn;

use crate::{
    cli::{FilterArg, ListArgs, SubCommand, TaskCommand},
    config::Config,
    storage,
};

/// Build the task store against the configured data directory. Completion of
/// `init` is the ready signal; commands run strictly after it.
pub async fn open_store(config: &Config) -> Result<TaskStore<NoopScheduler>> {
    let store = storage::store_from_config(config)?;
    Ok(TaskStore::init(Arc::new(store), Arc::new(UuidIds), NoopScheduler::default()).await)
}

/// Execute a task subcommand.
pub async fn handle(cmd: TaskCommand, config: &Config) -> Result<()> {
    let mut store = open_store(config).await?;

    match cmd {
        TaskCommand::Add {
            title,
            description,
            priority,
            due,
            tags,
        } => {
            let draft = TaskDraft {
                title,
                description,
                priority: priority.into(),
                due_date: parse_due(due.as_deref())?,
                tags,
                ..TaskDraft::default()
            };
            let task = store.create_task(draft).await;
            println!("Task created {}: {}", task.id, task.title);
        }
        TaskCommand::List(args) => {
            store.set_filter(filter_from(args));
            let visible = store.filtered();
            if visible.is_empty() {
                println!("No matching tasks. Add one with `taskpad task add <title>`.");
                return Ok(());
            }
            for task in &visible {
                render(task);
            }
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let due_date = match (due, clear_due) {
                (Some(raw), _) => Some(parse_due(Some(&raw))?),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TaskPatch {
                title,
                description,
                priority: priority.map(Into::into),
                status: None,
                due_date,
                tags: tags_patch(tags, clear_tags),
            };
            report(store.update_task(&id, patch).await, &id, "Task updated");
        }
        TaskCommand::Rm { id } => {
            report(store.delete_task(&id).await, &id, "Task deleted");
        }
        TaskCommand::Toggle { id } => match store.toggle_task_status(&id).await {
            Mutation::Applied(task) => {
                println!("{}: now {}", task.title, status_label(&task.status))
            }
            Mutation::NotFound => not_found(&id),
        },
    }

    Ok(())
}

/// Execute a subtask subcommand.
pub async fn handle_sub(cmd: SubCommand, config: &Config) -> Result<()> {
    let mut store = open_store(config).await?;

    match cmd {
        SubCommand::Add { task_id, title } => {
            report(
                store.add_subtask(&task_id, title).await,
                &task_id,
                "Subtask added",
            );
        }
        SubCommand::Toggle {
            task_id,
            subtask_id,
        } => {
            report(
                store.toggle_subtask(&task_id, &subtask_id).await,
                &task_id,
                "Subtask toggled",
            );
        }
        SubCommand::Rm {
            task_id,
            subtask_id,
        } => {
            report(
                store.delete_subtask(&task_id, &subtask_id).await,
                &task_id,
                "Subtask deleted",
            );
        }
    }

    Ok(())
}

/// Print every tag in use.
pub async fn handle_tags(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let tags = store.tags();
    if tags.is_empty() {
        println!("No tags in use.");
    } else {
        println!("{}", tags.join("\n"));
    }
    Ok(())
}

fn filter_from(args: ListArgs) -> TaskFilter {
    let FilterArg(status) = args.status.into();
    let FilterArg(priority) = args.priority.into();
    TaskFilter {
        search: args.search,
        status,
        priority,
        tags: args.tags,
    }
}

// No tag flags at all means "leave tags alone"; --clear-tags means "replace
// with the empty set".
fn tags_patch(tags: Vec<String>, clear: bool) -> Option<Vec<String>> {
    if clear {
        Some(Vec::new())
    } else if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

fn parse_due(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| color_eyre::eyre::eyre!("invalid due date {raw:?}: {e}"))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

fn report(outcome: Mutation, id: &str, message: &str) {
    match outcome {
        Mutation::Applied(task) => println!("{message}: {}", task.title),
        Mutation::NotFound => not_found(id),
    }
}

fn not_found(id: &str) {
    warn!(id, "no such task");
    println!("No task with id {id}.");
}

fn render(task: &Task) {
    println!(
        "{} [{}] ({}) {}",
        task.id,
        status_label(&task.status),
        priority_label(&task.priority),
        task.title
    );
    if !task.description.is_empty() {
        println!("    {}", task.description);
    }
    if let Some(due) = task.due_date {
        println!("    due: {}", due.to_rfc3339());
    }
    if !task.tags.is_empty() {
        println!("    tags: {}", task.tags.join(", "));
    }
    for sub in &task.subtasks {
        let mark = if sub.completed { "x" } else { " " };
        println!("    [{mark}] {} {}", sub.id, sub.title);
    }
}

fn status_label(status: &TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Completed => "completed",
    }
}

fn priority_label(priority: &TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
    }
}
