//! Mutation protocol between the user, the gateway and the state store.
//!
//! Every successful mutation is followed by a full re-fetch of the list and
//! the stats; failures leave the store untouched. List and stats requests are
//! tagged with tokens so that only the most recently issued response is
//! applied.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ControllerError, GatewayError};
use crate::gateway::{GatewayResult, TaskGateway};
use crate::model::{
    FilterConfig, FilterPatch, HealthStatus, TaskDraft, TaskPatch, TaskRecord, TaskStats,
};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// A message for the user, drained and displayed by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Token identifying one issued list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// Token identifying one issued stats request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Stale,
}

pub struct Controller<G: TaskGateway> {
    gateway: Arc<G>,
    store: StateStore,
    stats: TaskStats,
    list_token: u64,
    stats_token: u64,
    notices: VecDeque<Notice>,
}

impl<G: TaskGateway> Controller<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_filter(gateway, FilterConfig::default())
    }

    pub fn with_filter(gateway: Arc<G>, filter: FilterConfig) -> Self {
        Self {
            gateway,
            store: StateStore::new(filter),
            stats: TaskStats::default(),
            list_token: 0,
            stats_token: 0,
            notices: VecDeque::new(),
        }
    }

    pub fn gateway(&self) -> Arc<G> {
        Arc::clone(&self.gateway)
    }

    pub fn view(&self) -> Vec<TaskRecord> {
        self.store.view()
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        self.store.tasks()
    }

    pub fn find(&self, id: &str) -> Option<&TaskRecord> {
        self.store.find(id)
    }

    pub fn filter(&self) -> &FilterConfig {
        self.store.filter()
    }

    pub fn set_filter(&mut self, patch: FilterPatch) {
        self.store.set_filter(patch);
    }

    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push_back(Notice {
            kind,
            message: message.into(),
        });
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Issue a new list request token. Any response for an earlier token
    /// becomes stale from this point on.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.list_token += 1;
        RefreshTicket(self.list_token)
    }

    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: GatewayResult<Vec<TaskRecord>>,
    ) -> Result<RefreshOutcome, ControllerError> {
        if ticket.0 != self.list_token {
            tracing::warn!(
                token = ticket.0,
                latest = self.list_token,
                "discarding stale task list response"
            );
            return Ok(RefreshOutcome::Stale);
        }

        match result {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "task list refreshed");
                self.store.set_tasks(tasks);
                Ok(RefreshOutcome::Applied)
            }
            Err(err) => Err(self.fail("load tasks", err)),
        }
    }

    pub fn begin_stats(&mut self) -> StatsTicket {
        self.stats_token += 1;
        StatsTicket(self.stats_token)
    }

    /// Apply a stats response. A failed fetch zeroes the counters.
    pub fn complete_stats(
        &mut self,
        ticket: StatsTicket,
        result: GatewayResult<TaskStats>,
    ) -> Result<RefreshOutcome, ControllerError> {
        if ticket.0 != self.stats_token {
            tracing::warn!(
                token = ticket.0,
                latest = self.stats_token,
                "discarding stale stats response"
            );
            return Ok(RefreshOutcome::Stale);
        }

        match result {
            Ok(stats) => {
                self.stats = stats;
                Ok(RefreshOutcome::Applied)
            }
            Err(err) => {
                self.stats = TaskStats::default();
                Err(self.fail("load statistics", err))
            }
        }
    }

    pub async fn refresh_tasks(&mut self) -> Result<RefreshOutcome, ControllerError> {
        let ticket = self.begin_refresh();
        let result = self.gateway.list_tasks().await;
        self.complete_refresh(ticket, result)
    }

    pub async fn refresh_stats(&mut self) -> Result<RefreshOutcome, ControllerError> {
        let ticket = self.begin_stats();
        let result = self.gateway.fetch_stats().await;
        self.complete_stats(ticket, result)
    }

    /// Re-fetch both the list and the stats. Both are attempted; the first
    /// failure is returned.
    pub async fn refresh(&mut self) -> Result<(), ControllerError> {
        let tasks = self.refresh_tasks().await;
        let stats = self.refresh_stats().await;
        tasks?;
        stats?;
        Ok(())
    }

    pub async fn create(&mut self, draft: TaskDraft) -> Result<TaskRecord, ControllerError> {
        match self.gateway.create_task(&draft).await {
            Ok(record) => {
                tracing::info!(id = %record.id, title = %record.title, "task created");
                self.notify(NoticeKind::Success, "Task created");
                self.after_mutation().await;
                Ok(record)
            }
            Err(err) => Err(self.fail("create task", err)),
        }
    }

    pub async fn update(
        &mut self,
        id: &str,
        patch: TaskPatch,
    ) -> Result<TaskRecord, ControllerError> {
        let record = self.send_update(id, &patch).await?;
        self.notify(NoticeKind::Success, "Task updated");
        self.after_mutation().await;
        Ok(record)
    }

    /// Mark a task completed or active. Completing forces progress to 100;
    /// reopening keeps the progress the task had.
    pub async fn set_completed(
        &mut self,
        id: &str,
        completed: bool,
    ) -> Result<TaskRecord, ControllerError> {
        let patch = match self.store.find(id) {
            Some(record) => TaskPatch::completion(record, completed),
            None => return Err(self.unknown_task(id)),
        };

        let record = self.send_update(id, &patch).await?;
        let message = if completed {
            "Task completed"
        } else {
            "Task reopened"
        };
        self.notify(NoticeKind::Success, message);
        self.after_mutation().await;
        Ok(record)
    }

    pub async fn toggle_completed(&mut self, id: &str) -> Result<TaskRecord, ControllerError> {
        let completed = match self.store.find(id) {
            Some(record) => record.completed,
            None => return Err(self.unknown_task(id)),
        };
        self.set_completed(id, !completed).await
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ControllerError> {
        match self.gateway.delete_task(id).await {
            Ok(()) => {
                tracing::info!(id, "task deleted");
                self.notify(NoticeKind::Success, "Task deleted");
                self.after_mutation().await;
                Ok(())
            }
            Err(err) => Err(self.fail("delete task", err)),
        }
    }

    /// Move `id` next to `target_id` in the server order.
    pub async fn reorder(&mut self, id: &str, target_id: &str) -> Result<(), ControllerError> {
        match self.gateway.reorder(id, target_id).await {
            Ok(message) => {
                tracing::info!(id, target_id, "task order updated");
                let message = if message.is_empty() {
                    "Order updated".to_string()
                } else {
                    message
                };
                self.notify(NoticeKind::Success, message);
                self.after_mutation().await;
                Ok(())
            }
            Err(err) => Err(self.fail("reorder tasks", err)),
        }
    }

    pub async fn check_health(&mut self) -> Result<HealthStatus, ControllerError> {
        match self.gateway.health().await {
            Ok(health) => {
                let kind = if health.is_ok() {
                    NoticeKind::Info
                } else {
                    NoticeKind::Error
                };
                self.notify(kind, format!("Server status: {}", health.status));
                Ok(health)
            }
            Err(err) => Err(self.fail("check server health", err)),
        }
    }

    pub async fn backup(&mut self) -> Result<String, ControllerError> {
        match self.gateway.create_backup().await {
            Ok(message) => {
                tracing::info!("backup created");
                let message = if message.is_empty() {
                    "Backup created".to_string()
                } else {
                    message
                };
                self.notify(NoticeKind::Success, message.clone());
                Ok(message)
            }
            Err(err) => Err(self.fail("create backup", err)),
        }
    }

    async fn send_update(
        &mut self,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<TaskRecord, ControllerError> {
        match self.gateway.update_task(id, patch).await {
            Ok(record) => {
                tracing::info!(id, completed = record.completed, "task updated");
                Ok(record)
            }
            Err(err) => Err(self.fail("update task", err)),
        }
    }

    async fn after_mutation(&mut self) {
        // Refresh failures have already queued their own notice.
        let _ = self.refresh().await;
    }

    fn fail(&mut self, action: &str, err: GatewayError) -> ControllerError {
        tracing::error!(error = %err, "failed to {action}");
        self.notify(NoticeKind::Error, err.user_message());
        ControllerError::Gateway(err)
    }

    fn unknown_task(&mut self, id: &str) -> ControllerError {
        let err = ControllerError::UnknownTask(id.to_string());
        tracing::error!(error = %err, "rejected completion toggle");
        self.notify(NoticeKind::Error, err.user_message());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayOp;
    use crate::gateway::MemoryGateway;
    use crate::model::{Category, Priority, SortKey, StatusFilter};
    use pretty_assertions::assert_eq;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            description: None,
            category: Category::Study,
            priority: Priority::Medium,
            progress: 40,
            due: None,
        }
    }

    async fn seeded(titles: &[&str]) -> (Arc<MemoryGateway>, Controller<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        for title in titles {
            gateway.create_task(&draft(title)).await.unwrap();
        }
        let mut controller = Controller::new(Arc::clone(&gateway));
        controller.refresh().await.unwrap();
        (gateway, controller)
    }

    fn kinds(notices: &[Notice]) -> Vec<NoticeKind> {
        notices.iter().map(|notice| notice.kind).collect()
    }

    #[tokio::test]
    async fn refresh_loads_tasks_and_stats() {
        let (_gateway, controller) = seeded(&["a", "b"]).await;
        assert_eq!(controller.tasks().len(), 2);
        assert_eq!(controller.stats().total, 2);
        assert_eq!(controller.stats().by_priority.medium, 2);
    }

    #[tokio::test]
    async fn stale_list_responses_are_discarded() {
        let (gateway, mut controller) = seeded(&["a", "b"]).await;
        let older = controller.begin_refresh();
        let older_result = gateway.list_tasks().await;

        gateway.delete_task("1").await.unwrap();
        let newer = controller.begin_refresh();
        let newer_result = gateway.list_tasks().await;

        assert_eq!(
            controller.complete_refresh(newer, newer_result).unwrap(),
            RefreshOutcome::Applied
        );
        assert_eq!(
            controller.complete_refresh(older, older_result).unwrap(),
            RefreshOutcome::Stale
        );
        assert_eq!(controller.tasks().len(), 1);
        assert_eq!(controller.tasks()[0].id, "2");
    }

    #[tokio::test]
    async fn stale_failures_are_silent() {
        let (_gateway, mut controller) = seeded(&["a"]).await;
        controller.drain_notices();
        let older = controller.begin_refresh();
        let _newer = controller.begin_refresh();
        let failure = Err(GatewayError::Server {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(
            controller.complete_refresh(older, failure).unwrap(),
            RefreshOutcome::Stale
        );
        assert!(controller.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn create_refetches_and_notifies() {
        let (gateway, mut controller) = seeded(&[]).await;
        controller.drain_notices();
        let lists_before = gateway.requests(GatewayOp::List);

        let record = controller.create(draft("write tests")).await.unwrap();
        assert_eq!(controller.tasks().len(), 1);
        assert_eq!(controller.find(&record.id).unwrap().title, "write tests");
        assert_eq!(gateway.requests(GatewayOp::List), lists_before + 1);
        assert_eq!(controller.stats().total, 1);
        assert_eq!(kinds(&controller.drain_notices()), vec![NoticeKind::Success]);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_store_untouched() {
        let (gateway, mut controller) = seeded(&["a", "b"]).await;
        controller.drain_notices();
        let before = controller.tasks().to_vec();
        let lists_before = gateway.requests(GatewayOp::List);

        gateway.fail_next(GatewayOp::Delete, "Todo is locked");
        let err = controller.delete("1").await.unwrap_err();

        assert_eq!(err.user_message(), "Todo is locked");
        assert_eq!(controller.tasks(), before.as_slice());
        assert_eq!(gateway.requests(GatewayOp::List), lists_before);
        let notices = controller.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(notices[0].message, "Todo is locked");
    }

    #[tokio::test]
    async fn completing_forces_progress_to_full() {
        let (_gateway, mut controller) = seeded(&["a"]).await;
        let record = controller.set_completed("1", true).await.unwrap();
        assert!(record.completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.category, Category::Study);
        assert!(controller.find("1").unwrap().completed);
    }

    #[tokio::test]
    async fn reopening_keeps_progress() {
        let (gateway, mut controller) = seeded(&["a"]).await;
        gateway
            .update_task(
                "1",
                &TaskPatch {
                    completed: Some(true),
                    progress: Some(70),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        controller.refresh().await.unwrap();

        let record = controller.toggle_completed("1").await.unwrap();
        assert!(!record.completed);
        assert_eq!(record.progress, 70);
    }

    #[tokio::test]
    async fn toggling_unknown_task_is_rejected() {
        let (gateway, mut controller) = seeded(&["a"]).await;
        let err = controller.set_completed("99", true).await.unwrap_err();
        assert_eq!(err, ControllerError::UnknownTask("99".into()));
        assert_eq!(gateway.requests(GatewayOp::Update), 0);
    }

    #[tokio::test]
    async fn stats_failure_zeroes_counters() {
        let (gateway, mut controller) = seeded(&["a", "b"]).await;
        controller.drain_notices();
        gateway.fail_next(GatewayOp::Stats, "stats unavailable");

        assert!(controller.refresh().await.is_err());
        assert_eq!(controller.stats(), &TaskStats::default());
        assert_eq!(controller.tasks().len(), 2);
        assert_eq!(
            kinds(&controller.drain_notices()),
            vec![NoticeKind::Error]
        );
    }

    #[tokio::test]
    async fn list_failure_keeps_previous_collection() {
        let (gateway, mut controller) = seeded(&["a", "b"]).await;
        gateway.fail_next(GatewayOp::List, "down");
        assert!(controller.refresh_tasks().await.is_err());
        assert_eq!(controller.tasks().len(), 2);
    }

    #[tokio::test]
    async fn reorder_refetches_server_order() {
        let (_gateway, mut controller) = seeded(&["a", "b", "c"]).await;
        controller.set_filter(FilterPatch::sort(SortKey::Manual));
        controller.reorder("3", "1").await.unwrap();
        let titles: Vec<String> = controller.view().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn view_applies_active_filter() {
        let (_gateway, mut controller) = seeded(&["a", "b"]).await;
        controller.set_completed("2", true).await.unwrap();
        controller.set_filter(FilterPatch::status(StatusFilter::Completed));
        let view = controller.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "2");
    }

    #[tokio::test]
    async fn health_and_backup_report_through_notices() {
        let (gateway, mut controller) = seeded(&[]).await;
        controller.drain_notices();
        assert!(controller.check_health().await.unwrap().is_ok());
        assert_eq!(controller.backup().await.unwrap(), "Backup created successfully");
        assert_eq!(gateway.backups(), 1);
        assert_eq!(
            kinds(&controller.drain_notices()),
            vec![NoticeKind::Info, NoticeKind::Success]
        );
    }
}
