use std::fmt;

use thiserror::Error;

/// Gateway operation a failure belongs to; picks the fallback message shown
/// when the server gives no usable error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    Create,
    Update,
    Delete,
    Stats,
    Health,
    Reorder,
    Backup,
}

impl GatewayOp {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            GatewayOp::List => "Could not load the task list",
            GatewayOp::Create => "Could not create the task",
            GatewayOp::Update => "Could not update the task",
            GatewayOp::Delete => "Could not delete the task",
            GatewayOp::Stats => "Could not load statistics",
            GatewayOp::Health => "Could not reach the server",
            GatewayOp::Reorder => "Could not reorder tasks",
            GatewayOp::Backup => "Could not create a backup",
        }
    }
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GatewayOp::List => "list",
            GatewayOp::Create => "create",
            GatewayOp::Update => "update",
            GatewayOp::Delete => "delete",
            GatewayOp::Stats => "stats",
            GatewayOp::Health => "health",
            GatewayOp::Reorder => "reorder",
            GatewayOp::Backup => "backup",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{op} request failed: {reason}")]
    Transport { op: GatewayOp, reason: String },
    #[error("unexpected {op} response: {reason}")]
    Decode { op: GatewayOp, reason: String },
    #[error("invalid API url '{0}'")]
    InvalidUrl(String),
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl GatewayError {
    /// Text suitable for a user-facing notice.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Server { message, .. } => message.clone(),
            GatewayError::Transport { op, .. } | GatewayError::Decode { op, .. } => {
                op.fallback_message().to_string()
            }
            GatewayError::InvalidUrl(_) | GatewayError::Client(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("no task with id '{0}'")]
    UnknownTask(String),
}

impl ControllerError {
    pub fn user_message(&self) -> String {
        match self {
            ControllerError::Gateway(err) => err.user_message(),
            ControllerError::UnknownTask(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Unknown category '{0}': expected work|personal|shopping|study|other")]
    UnknownCategory(String),
    #[error("Unknown priority '{0}': expected low|medium|high")]
    UnknownPriority(String),
    #[error("Progress must be a whole number between 0 and 100, got '{0}'")]
    InvalidProgress(String),
    #[error("{0}")]
    InvalidDate(String),
}
