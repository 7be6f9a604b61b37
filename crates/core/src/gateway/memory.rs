use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::{GatewayResult, TaskGateway};
use crate::error::{GatewayError, GatewayOp};
use crate::model::{
    Category, CategoryBreakdown, HealthStatus, Priority, PriorityBreakdown, TaskDraft, TaskPatch,
    TaskRecord, TaskStats,
};

/// In-process stand-in for the task server.
///
/// Mirrors the server's observable behaviour (id and timestamp assignment,
/// partial updates, stats, reordering) and lets callers queue failures for a
/// given operation.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    tasks: Vec<TaskRecord>,
    next_id: u64,
    clock: DateTime<Utc>,
    failures: HashMap<GatewayOp, Vec<String>>,
    requests: HashMap<GatewayOp, usize>,
    backups: usize,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
            clock: Utc::now(),
            failures: HashMap::new(),
            requests: HashMap::new(),
            backups: 0,
        }
    }
}

impl MemoryState {
    fn begin(&mut self, op: GatewayOp) -> GatewayResult<()> {
        *self.requests.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(|queue| queue.pop()) {
            Some(message) => Err(GatewayError::Server {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::seconds(1);
        self.clock
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }
}

fn not_found() -> GatewayError {
    GatewayError::Server {
        status: 404,
        message: "Todo not found".into(),
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection, kept in the given order.
    pub fn with_tasks(tasks: Vec<TaskRecord>) -> Self {
        let gateway = Self::default();
        gateway.state.lock().tasks = tasks;
        gateway
    }

    /// Make the next call of `op` fail with a server error carrying `message`.
    pub fn fail_next(&self, op: GatewayOp, message: impl Into<String>) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .insert(0, message.into());
    }

    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.state.lock().tasks.clone()
    }

    /// Number of calls received for `op`, failed ones included.
    pub fn requests(&self, op: GatewayOp) -> usize {
        self.state.lock().requests.get(&op).copied().unwrap_or(0)
    }

    pub fn backups(&self) -> usize {
        self.state.lock().backups
    }
}

#[async_trait]
impl TaskGateway for MemoryGateway {
    async fn list_tasks(&self) -> GatewayResult<Vec<TaskRecord>> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::List)?;
        Ok(state.tasks.clone())
    }

    async fn create_task(&self, draft: &TaskDraft) -> GatewayResult<TaskRecord> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Create)?;
        if draft.title.trim().is_empty() {
            return Err(GatewayError::Server {
                status: 400,
                message: "Missing required field: title".into(),
            });
        }

        let id = state.next_id.to_string();
        state.next_id += 1;
        let created = state.tick();
        let record = TaskRecord {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            priority: draft.priority,
            progress: draft.progress.min(100),
            completed: false,
            due: draft.due,
            created,
            updated: None,
        };
        state.tasks.push(record.clone());
        Ok(record)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> GatewayResult<TaskRecord> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Update)?;
        let index = state.position(id).ok_or_else(not_found)?;
        let updated = state.tick();

        let task = &mut state.tasks[index];
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = Some(description.clone()).filter(|text| !text.is_empty());
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(progress) = patch.progress {
            task.progress = progress.min(100);
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(due) = patch.due {
            task.due = due;
        }
        task.updated = Some(updated);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> GatewayResult<()> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Delete)?;
        let index = state.position(id).ok_or_else(not_found)?;
        state.tasks.remove(index);
        Ok(())
    }

    async fn fetch_stats(&self) -> GatewayResult<TaskStats> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Stats)?;
        Ok(compute_stats(&state.tasks, Utc::now()))
    }

    async fn health(&self) -> GatewayResult<HealthStatus> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Health)?;
        Ok(HealthStatus {
            status: "ok".into(),
            timestamp: Some(Utc::now()),
        })
    }

    async fn reorder(&self, id: &str, target_id: &str) -> GatewayResult<String> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Reorder)?;
        let invalid = || GatewayError::Server {
            status: 400,
            message: "Invalid todo id".into(),
        };
        let from = state.position(id).ok_or_else(invalid)?;
        let to = state.position(target_id).ok_or_else(invalid)?;
        let task = state.tasks.remove(from);
        // Moving up takes the target's slot; moving down lands after it.
        let slot = if to < from {
            to
        } else {
            (to + 1).min(state.tasks.len())
        };
        state.tasks.insert(slot, task);
        Ok("Order updated successfully".into())
    }

    async fn create_backup(&self) -> GatewayResult<String> {
        let mut state = self.state.lock();
        state.begin(GatewayOp::Backup)?;
        state.backups += 1;
        Ok("Backup created successfully".into())
    }
}

fn compute_stats(tasks: &[TaskRecord], now: DateTime<Utc>) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        by_priority: PriorityBreakdown::default(),
        by_category: CategoryBreakdown::default(),
        ..TaskStats::default()
    };

    let today = now.date_naive();
    for task in tasks {
        if task.completed {
            stats.completed += 1;
            if task.updated.is_some_and(|at| at.date_naive() == today) {
                stats.completed_today += 1;
            }
        } else {
            stats.active += 1;
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }

        match task.priority {
            Priority::High => stats.by_priority.high += 1,
            Priority::Medium => stats.by_priority.medium += 1,
            Priority::Low => stats.by_priority.low += 1,
        }
        let by_category = &mut stats.by_category;
        match task.category {
            Category::Work => by_category.work += 1,
            Category::Personal => by_category.personal += 1,
            Category::Shopping => by_category.shopping += 1,
            Category::Study => by_category.study += 1,
            Category::Other => by_category.other += 1,
        }
    }
    stats
}
