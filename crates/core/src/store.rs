use crate::engine;
use crate::model::{FilterConfig, FilterPatch, TaskRecord};

/// Last fetched collection plus the active filter. The rendered view is
/// always derived from these two on demand.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    tasks: Vec<TaskRecord>,
    filter: FilterConfig,
}

impl StateStore {
    pub fn new(filter: FilterConfig) -> Self {
        Self {
            tasks: Vec::new(),
            filter,
        }
    }

    /// Replace the whole collection with a fresh server listing.
    pub fn set_tasks(&mut self, tasks: Vec<TaskRecord>) {
        self.tasks = tasks;
    }

    /// Merge the given fields into the active filter.
    pub fn set_filter(&mut self, patch: FilterPatch) {
        if let Some(status) = patch.status {
            self.filter.status = status;
        }
        if let Some(category) = patch.category {
            self.filter.category = category;
        }
        if let Some(search) = patch.search {
            self.filter.search = search.trim().to_string();
        }
        if let Some(sort) = patch.sort {
            self.filter.sort = sort;
        }
    }

    pub fn view(&self) -> Vec<TaskRecord> {
        engine::apply(&self.tasks, &self.filter)
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn find(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|task| task.id == id)
    }
}
