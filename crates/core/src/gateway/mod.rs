//! Black-box access to the remote task API.

mod http;
mod memory;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{HealthStatus, TaskDraft, TaskPatch, TaskRecord, TaskStats};

pub use http::HttpGateway;
pub use memory::MemoryGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Request/response interface to the server that owns task storage.
///
/// Implementations resolve with the server's view of the data and never
/// touch client state; the controller decides what to do with results.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn list_tasks(&self) -> GatewayResult<Vec<TaskRecord>>;

    async fn create_task(&self, draft: &TaskDraft) -> GatewayResult<TaskRecord>;

    /// Apply a partial update. Fields absent from `patch` are left unchanged
    /// on the server.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> GatewayResult<TaskRecord>;

    async fn delete_task(&self, id: &str) -> GatewayResult<()>;

    async fn fetch_stats(&self) -> GatewayResult<TaskStats>;

    async fn health(&self) -> GatewayResult<HealthStatus>;

    /// Move `id` next to `target_id`: into the target's slot when moving up,
    /// directly after the target when moving down.
    async fn reorder(&self, id: &str, target_id: &str) -> GatewayResult<String>;

    /// Ask the server to snapshot its storage; resolves with its message.
    async fn create_backup(&self) -> GatewayResult<String>;
}
