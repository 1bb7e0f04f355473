use clap::{Args, Parser, Subcommand, ValueEnum};
use taskpad_core::tasks::{PriorityFilter, StatusFilter, TaskPriority, TaskStatus};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "taskpad",
    about = "Local-first task manager with due-date reminders",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to listing tasks when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage subtasks of a task.
    #[command(subcommand)]
    Sub(SubCommand),
    /// List every tag in use, sorted.
    Tags,
    /// Inspect or change notification settings.
    #[command(subcommand)]
    Notify(NotifyCommand),
    /// Run a health check against the storage backend.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version and exit.
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// Add a new task.
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, value_enum, default_value = "medium")]
        priority: PriorityArg,
        /// Due date as RFC 3339, e.g. 2026-09-01T17:00:00Z.
        #[arg(long)]
        due: Option<String>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// List tasks, optionally narrowed by a filter.
    List(ListArgs),
    /// Edit fields of an existing task.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date (and any pending reminder).
        #[arg(long)]
        clear_due: bool,
        /// Replace the tag set.
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Remove every tag.
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },
    /// Delete a task.
    Rm { id: String },
    /// Advance a task one step: todo → in-progress → completed → todo.
    Toggle { id: String },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Case-insensitive substring matched against title and description.
    #[arg(short, long, default_value = "")]
    pub search: String,
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,
    /// Show tasks carrying at least one of these tags.
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SubCommand {
    /// Add a subtask to a task.
    Add { task_id: String, title: String },
    /// Flip a subtask's completion flag.
    Toggle { task_id: String, subtask_id: String },
    /// Remove a subtask.
    Rm { task_id: String, subtask_id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum NotifyCommand {
    /// Print the current notification settings.
    Show,
    /// Change notification settings; reminders are rebuilt afterwards.
    Set {
        #[arg(long)]
        enabled: Option<bool>,
        /// Minutes before the due date to fire reminders.
        #[arg(long)]
        lead: Option<i64>,
        #[arg(long)]
        sound: Option<bool>,
    },
    /// Request notification permission from the platform.
    Permission,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    Todo,
    InProgress,
    Completed,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Todo => TaskStatus::Todo,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::Completed => TaskStatus::Completed,
        }
    }
}

impl From<Option<StatusArg>> for FilterArg<StatusFilter> {
    fn from(arg: Option<StatusArg>) -> Self {
        FilterArg(match arg {
            None => StatusFilter::All,
            Some(status) => StatusFilter::Is(status.into()),
        })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => TaskPriority::Low,
            PriorityArg::Medium => TaskPriority::Medium,
            PriorityArg::High => TaskPriority::High,
        }
    }
}

impl From<Option<PriorityArg>> for FilterArg<PriorityFilter> {
    fn from(arg: Option<PriorityArg>) -> Self {
        FilterArg(match arg {
            None => PriorityFilter::All,
            Some(priority) => PriorityFilter::Is(priority.into()),
        })
    }
}

/// Thin newtype so the Option-to-filter conversions stay local to this module.
pub struct FilterArg<T>(pub T);
