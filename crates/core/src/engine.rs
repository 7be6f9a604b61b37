//! Filter and sort pipeline turning the fetched collection into the rendered view.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::model::{FilterConfig, SortKey, StatusFilter, TaskRecord};

/// Apply `config` to `tasks` and return the ordered view. The input is never
/// mutated; an empty result is a valid "no results" view, not an error.
pub fn apply(tasks: &[TaskRecord], config: &FilterConfig) -> Vec<TaskRecord> {
    let needle = config.search.trim().to_lowercase();
    let mut view: Vec<TaskRecord> = tasks
        .iter()
        .filter(|task| matches_status(task, config.status))
        .filter(|task| config.category.map_or(true, |c| task.category == c))
        .filter(|task| matches_search(task, &needle))
        .cloned()
        .collect();
    sort_tasks(&mut view, config.sort);
    view
}

pub fn matches_status(task: &TaskRecord, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Active => !task.completed,
        StatusFilter::Completed => task.completed,
    }
}

/// `needle` must already be lowercased.
pub fn matches_search(task: &TaskRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(needle))
}

/// Stable in-place sort of an already filtered view.
pub fn sort_tasks(tasks: &mut [TaskRecord], key: SortKey) {
    match key {
        SortKey::Due => tasks.sort_by(compare_due),
        SortKey::Priority => tasks.sort_by_key(|task| task.priority.rank()),
        SortKey::Created => tasks.sort_by(|a, b| b.created.cmp(&a.created)),
        SortKey::Manual => {}
    }
}

fn compare_due(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    // Undated tasks behave as if due at the end of time.
    let a_due = a.due.unwrap_or(DateTime::<Utc>::MAX_UTC);
    let b_due = b.due.unwrap_or(DateTime::<Utc>::MAX_UTC);
    a_due.cmp(&b_due)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub tasks: Vec<TaskRecord>,
}

/// Group a view by local due date for the calendar screen. Undated tasks are
/// left out; dates ascend and each day keeps the view's order.
pub fn group_by_due_date(view: &[TaskRecord]) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<TaskRecord>> = BTreeMap::new();
    for task in view {
        if let Some(due) = task.due {
            let date = due.with_timezone(&Local).date_naive();
            days.entry(date).or_default().push(task.clone());
        }
    }
    days.into_iter()
        .map(|(date, tasks)| DayGroup { date, tasks })
        .collect()
}
