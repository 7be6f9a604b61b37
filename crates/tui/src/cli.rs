use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

use tasklist_core::CaptureInput;
use tasklist_core::{Category, Priority, SortKey, StatusFilter};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasklist",
    version,
    about = "Keyboard-driven client for a remote to-do list API.",
    after_help = "Examples:\n  tasklist                 Launch the TUI (same as `tasklist tui`)\n  tasklist add Buy milk #shopping p:high due:tomorrow\n  tasklist list --status active --sort priority\n  tasklist --api-url http://10.0.0.5:5000/api stats"
)]
pub struct Cli {
    /// Base URL of the task API (defaults to http://127.0.0.1:5000/api)
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the data directory used for logs (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter (e.g. "info", "debug", "tasklist_core=trace")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Launch the keyboard-first terminal UI (default command)
    Tui,
    /// Print tasks after filtering and sorting
    List(ListArgs),
    /// Create a task from quick-capture text
    Add(AddArgs),
    /// Mark a task completed (progress becomes 100)
    Done(IdArgs),
    /// Mark a completed task active again
    Undo(IdArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Show aggregate statistics
    Stats,
    /// Check that the server is reachable
    Health,
    /// Move a task next to another in server order (above it when moving up, below when moving down)
    Move(MoveArgs),
    /// Ask the server to back up its storage
    Backup,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Completion status to show
    #[arg(long, value_enum, default_value_t = StatusFilter::All)]
    pub status: StatusFilter,

    /// Only show one category
    #[arg(long, value_enum)]
    pub category: Option<Category>,

    /// Case-insensitive text matched against title and description
    #[arg(long)]
    pub search: Option<String>,

    /// Sort order
    #[arg(long, value_enum, default_value_t = SortKey::Due)]
    pub sort: SortKey,

    /// Emit the view as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title with optional inline tokens (#category, p:, due:, prog:)
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Description words written after `--`
    #[arg(value_name = "DESCRIPTION", last = true)]
    pub description_words: Vec<String>,

    /// Longer description (overrides text after `--`)
    #[arg(long)]
    pub description: Option<String>,

    /// Category (overrides inline #category)
    #[arg(long, value_enum)]
    pub category: Option<Category>,

    /// Priority (overrides inline p:)
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Due date (ISO e.g. 2024-12-24, today, +3d, fri, 18:00)
    #[arg(long = "due", value_name = "DATE")]
    pub due: Option<String>,

    /// Initial progress percentage
    #[arg(long, value_parser = value_parser!(u8).range(0..=100))]
    pub progress: Option<u8>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Task id
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Task to move
    #[arg(value_name = "ID")]
    pub id: String,

    /// Task whose position it takes
    #[arg(value_name = "TARGET")]
    pub target: String,
}

impl From<AddArgs> for CaptureInput {
    fn from(args: AddArgs) -> Self {
        let trailing = (!args.description_words.is_empty())
            .then(|| args.description_words.join(" "));
        CaptureInput {
            text: args.text,
            description: args.description.or(trailing),
            category: args.category,
            priority: args.priority,
            due: args.due,
            progress: args.progress,
        }
    }
}
