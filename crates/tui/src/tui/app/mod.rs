use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use ratatui::style::{Color, Style};
use ratatui::widgets::TableState;
use tasklist_core::{
    compose_capture, parse_capture, CaptureInput, Controller, Debouncer, FilterPatch,
    GatewayResult, NoticeKind, RefreshOutcome, RefreshTicket, SortKey, StatsTicket,
    StatusFilter, TaskDraft, TaskGateway, TaskPatch, TaskRecord, TaskStats,
};
use tokio::runtime::Runtime;

use super::buffer::TextBuffer;
use super::constants::*;
use super::filters::{filter_summary, FilterFacets, FilterOverlay, FilterSelection};
use crate::config::AppConfig;

mod commands;
mod input;
mod render;
#[cfg(test)]
mod tests;

use commands::Suggestion;

#[derive(Debug, Clone, Copy)]
struct ViewTab {
    label: &'static str,
    status: StatusFilter,
    description: &'static str,
}

const TABS: [ViewTab; 3] = [
    ViewTab {
        label: "📋 All",
        status: StatusFilter::All,
        description: "All tasks",
    },
    ViewTab {
        label: "⏳ Active",
        status: StatusFilter::Active,
        description: "Tasks still open",
    },
    ViewTab {
        label: "✅ Completed",
        status: StatusFilter::Completed,
        description: "Finished tasks",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Add,
    Edit,
    Command,
    Search,
    Filter,
    Inspect,
    Help,
    ConfirmDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmChoice {
    Yes,
    No,
}

impl ConfirmChoice {
    fn toggle(self) -> Self {
        match self {
            ConfirmChoice::Yes => ConfirmChoice::No,
            ConfirmChoice::No => ConfirmChoice::Yes,
        }
    }
}

#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    kind: StatusKind,
    created_at: Instant,
}

impl StatusMessage {
    fn new<T: Into<String>>(text: T, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created_at: Instant::now(),
        }
    }

    fn style(&self) -> Style {
        match self.kind {
            StatusKind::Info => Style::default().fg(Color::Cyan),
            StatusKind::Success => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Success,
    Error,
}

impl From<NoticeKind> for StatusKind {
    fn from(kind: NoticeKind) -> Self {
        match kind {
            NoticeKind::Success => StatusKind::Success,
            NoticeKind::Info => StatusKind::Info,
            NoticeKind::Error => StatusKind::Error,
        }
    }
}

/// Results delivered back to the event loop by background tasks.
#[derive(Debug)]
pub(crate) enum AppEvent {
    TasksLoaded(RefreshTicket, GatewayResult<Vec<TaskRecord>>),
    StatsLoaded(StatsTicket, GatewayResult<TaskStats>),
    SearchSettled(String),
}

pub(crate) struct App<G: TaskGateway + 'static> {
    config: AppConfig,
    runtime: Runtime,
    controller: Controller<G>,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    search_debounce: Debouncer,
    view: Vec<TaskRecord>,
    calendar: bool,
    loading: bool,
    selected: usize,
    table_state: TableState,
    input_mode: InputMode,
    input: TextBuffer,
    search_before: String,
    suggestions: Vec<Suggestion>,
    suggestion_index: usize,
    status: Option<StatusMessage>,
    filter_overlay: Option<FilterOverlay>,
    editing_task_id: Option<String>,
    inspect_task: Option<TaskRecord>,
    confirm_choice: ConfirmChoice,
    should_quit: bool,
}

impl<G: TaskGateway + 'static> App<G> {
    pub(crate) fn new(config: AppConfig, gateway: Arc<G>, runtime: Runtime) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let search_debounce = Debouncer::new(config.search_debounce());
        Self {
            config,
            runtime,
            controller: Controller::new(gateway),
            events_tx,
            events_rx,
            search_debounce,
            view: Vec::new(),
            calendar: false,
            loading: false,
            selected: 0,
            table_state: TableState::default(),
            input_mode: InputMode::Normal,
            input: TextBuffer::new(),
            search_before: String::new(),
            suggestions: Vec::new(),
            suggestion_index: 0,
            status: None,
            filter_overlay: None,
            editing_task_id: None,
            inspect_task: None,
            confirm_choice: ConfirmChoice::No,
            should_quit: false,
        }
    }

    /// Fetch the list and stats, waiting for both. Used before the first
    /// frame so the screen opens populated.
    pub(crate) fn load(&mut self) {
        let _ = self.runtime.block_on(self.controller.refresh());
        self.after_controller_call();
    }

    /// Fetch the list and stats on the runtime without blocking input.
    /// Results arrive through [`App::on_tick`].
    pub(crate) fn request_refresh(&mut self) {
        let list_ticket = self.controller.begin_refresh();
        let stats_ticket = self.controller.begin_stats();
        let gateway = self.controller.gateway();
        let tx = self.events_tx.clone();
        self.loading = true;
        tracing::debug!("background refresh requested");

        self.runtime.spawn(async move {
            let tasks = gateway.list_tasks().await;
            if tx.send(AppEvent::TasksLoaded(list_ticket, tasks)).is_err() {
                return;
            }
            let stats = gateway.fetch_stats().await;
            let _ = tx.send(AppEvent::StatsLoaded(stats_ticket, stats));
        });
    }

    pub(crate) fn on_tick(&mut self) {
        self.process_events();
        if let Some(status) = &self.status {
            if status.created_at.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::TasksLoaded(ticket, result) => {
                    let outcome = self.controller.complete_refresh(ticket, result);
                    if !matches!(outcome, Ok(RefreshOutcome::Stale)) {
                        self.loading = false;
                    }
                    self.sync_view();
                }
                AppEvent::StatsLoaded(ticket, result) => {
                    let _ = self.controller.complete_stats(ticket, result);
                }
                AppEvent::SearchSettled(text) => {
                    self.controller.set_filter(FilterPatch::search(text));
                    self.sync_view();
                    self.request_refresh();
                }
            }
        }
        self.drain_notices();
    }

    /// Schedule a search for `text` once typing pauses.
    fn schedule_search(&mut self, text: String) {
        let tx = self.events_tx.clone();
        let _guard = self.runtime.enter();
        self.search_debounce.call(async move {
            let _ = tx.send(AppEvent::SearchSettled(text));
        });
    }

    fn apply_search_now(&mut self, text: String) {
        self.search_debounce.cancel();
        self.controller.set_filter(FilterPatch::search(text));
        self.sync_view();
    }

    fn drain_notices(&mut self) {
        if let Some(notice) = self.controller.drain_notices().pop() {
            self.status = Some(StatusMessage::new(notice.message, notice.kind.into()));
        }
    }

    fn after_controller_call(&mut self) {
        self.loading = false;
        self.sync_view();
        self.drain_notices();
    }

    /// Recompute the visible rows from the store, keeping the selection on
    /// the same task when it is still visible.
    fn sync_view(&mut self) {
        let selected_id = self.selected_task().map(|task| task.id.clone());
        self.view = self.controller.view();
        if let Some(id) = selected_id {
            if let Some(idx) = self.view.iter().position(|task| task.id == id) {
                self.selected = idx;
            }
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        if self.view.is_empty() {
            self.selected = 0;
            self.table_state.select(None);
        } else {
            if self.selected >= self.view.len() {
                self.selected = self.view.len() - 1;
            }
            self.table_state.select(Some(self.selected));
        }
    }

    fn selected_task(&self) -> Option<&TaskRecord> {
        self.view.get(self.selected)
    }

    fn tab_index(&self) -> usize {
        let status = self.controller.filter().status;
        TABS.iter().position(|tab| tab.status == status).unwrap_or(0)
    }

    fn set_status_filter(&mut self, status: StatusFilter) {
        self.controller.set_filter(FilterPatch::status(status));
        self.sync_view();
    }

    fn next_tab(&mut self) {
        let next = (self.tab_index() + 1) % TABS.len();
        self.set_status_filter(TABS[next].status);
    }

    fn prev_tab(&mut self) {
        let idx = self.tab_index();
        let prev = if idx == 0 { TABS.len() - 1 } else { idx - 1 };
        self.set_status_filter(TABS[prev].status);
    }

    fn select_next(&mut self) {
        if self.view.is_empty() {
            return;
        }
        self.selected = (self.selected + 1).min(self.view.len() - 1);
        self.table_state.select(Some(self.selected));
    }

    fn select_prev(&mut self) {
        if self.view.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_sub(1);
        self.table_state.select(Some(self.selected));
    }

    fn select_task_by_id(&mut self, id: &str) {
        if let Some(idx) = self.view.iter().position(|task| task.id == id) {
            self.selected = idx;
            self.table_state.select(Some(idx));
        }
    }

    fn cycle_sort(&mut self) {
        let current = self.controller.filter().sort;
        let idx = SortKey::ALL.iter().position(|key| *key == current).unwrap_or(0);
        let next = SortKey::ALL[(idx + 1) % SortKey::ALL.len()];
        self.set_sort(next);
    }

    fn set_sort(&mut self, sort: SortKey) {
        self.controller.set_filter(FilterPatch::sort(sort));
        self.sync_view();
        self.set_status_info(format!("Sorted by {}", sort.label()));
    }

    fn start_add(&mut self) {
        self.input_mode = InputMode::Add;
        self.input.clear();
        self.set_status_info(STATUS_ENTER_ADD);
    }

    fn start_edit_current(&mut self) {
        match self.selected_task().cloned() {
            Some(task) => self.begin_edit_with_task(task),
            None => self.set_status_info("Nothing to edit"),
        }
    }

    fn start_edit_by_id(&mut self, id: &str) {
        match self.controller.find(id).cloned() {
            Some(task) => {
                self.select_task_by_id(id);
                self.begin_edit_with_task(task);
            }
            None => self.set_status_error(format!("No task with id '{id}'")),
        }
    }

    fn begin_edit_with_task(&mut self, task: TaskRecord) {
        self.input.set(compose_capture(&task));
        self.input_mode = InputMode::Edit;
        self.editing_task_id = Some(task.id);
        self.set_status_info(STATUS_ENTER_EDIT);
    }

    fn start_search(&mut self) {
        self.search_before = self.controller.filter().search.clone();
        self.input.set(self.search_before.clone());
        self.input_mode = InputMode::Search;
        self.set_status_info(STATUS_ENTER_SEARCH);
    }

    fn open_filter_overlay(&mut self) {
        let facets = FilterFacets::from_tasks(self.controller.tasks());
        let active = FilterSelection::from_config(self.controller.filter());
        self.filter_overlay = Some(FilterOverlay::new(facets, active));
        self.input_mode = InputMode::Filter;
        self.set_status_info(STATUS_FILTER_PICKER);
    }

    fn apply_filter_selection(&mut self, selection: FilterSelection) {
        self.controller.set_filter(selection.into_patch());
        self.sync_view();
    }

    fn filter_status_text(&self, prefix: &str, fallback: &str) -> String {
        match filter_summary(self.controller.filter()) {
            Some(summary) => format!("{prefix}: {summary}"),
            None => fallback.to_string(),
        }
    }

    /// Create a task from capture text. The form stays open when parsing or
    /// the request fails.
    fn add_task(&mut self) {
        if self.input.is_empty() {
            self.set_status_error("Enter a title before adding a task");
            return;
        }

        let draft = match parse_capture(&CaptureInput::from_line(self.input.as_str())) {
            Ok(draft) => draft,
            Err(err) => {
                self.set_status_error(err.to_string());
                return;
            }
        };

        let result = self.runtime.block_on(self.controller.create(draft));
        self.after_controller_call();
        if let Ok(record) = result {
            self.input.clear();
            self.input_mode = InputMode::Normal;
            self.select_task_by_id(&record.id);
        }
    }

    fn apply_edit(&mut self) {
        let Some(id) = self.editing_task_id.clone() else {
            self.set_status_error("No task selected for editing");
            return;
        };
        let text = self.input.as_str().trim().to_string();
        if self.edit_task_with_text(&id, &text) {
            self.input.clear();
            self.editing_task_id = None;
            self.input_mode = InputMode::Normal;
        }
    }

    fn cancel_edit(&mut self) {
        self.editing_task_id = None;
        self.input.clear();
        self.input_mode = InputMode::Normal;
        self.status = None;
    }

    /// Replace the editable fields of `id` with the parsed text. Returns
    /// whether the server accepted the update.
    fn edit_task_with_text(&mut self, id: &str, text: &str) -> bool {
        if text.is_empty() {
            self.set_status_error("Enter a title before saving");
            return false;
        }
        let mut draft = match parse_capture(&CaptureInput::from_line(text)) {
            Ok(draft) => draft,
            Err(err) => {
                self.set_status_error(format!("Edit failed: {err}"));
                return false;
            }
        };
        if let Some(original) = self.controller.find(id) {
            keep_multiline_description(&mut draft, original);
        }

        let patch = TaskPatch::from_draft(draft);
        let result = self.runtime.block_on(self.controller.update(id, patch));
        self.after_controller_call();
        match result {
            Ok(_) => {
                self.select_task_by_id(id);
                true
            }
            Err(_) => false,
        }
    }

    /// Flip the selected task's completion. The row shows the new state
    /// immediately and reverts when the server rejects the change.
    fn toggle_selected(&mut self) {
        let Some(task) = self.view.get_mut(self.selected) else {
            self.set_status_info("Nothing to complete");
            return;
        };
        let id = task.id.clone();
        let previous = task.completed;
        task.completed = !previous;

        let result = self
            .runtime
            .block_on(self.controller.set_completed(&id, !previous));
        if result.is_err() {
            if let Some(task) = self.view.iter_mut().find(|task| task.id == id) {
                task.completed = previous;
            }
            self.drain_notices();
            return;
        }
        self.after_controller_call();
    }

    fn set_completed_by_id(&mut self, id: &str, completed: bool) {
        let _ = self
            .runtime
            .block_on(self.controller.set_completed(id, completed));
        self.after_controller_call();
    }

    fn prompt_delete(&mut self) {
        if self.view.is_empty() {
            self.set_status_info("Nothing to delete");
            return;
        }
        self.confirm_choice = ConfirmChoice::No;
        self.input_mode = InputMode::ConfirmDelete;
        self.set_status_info(STATUS_CONFIRM_DELETE);
    }

    fn perform_delete(&mut self) {
        let Some(id) = self.selected_task().map(|task| task.id.clone()) else {
            self.set_status_info("Nothing to delete");
            return;
        };
        self.delete_by_id(&id);
    }

    fn delete_by_id(&mut self, id: &str) {
        let _ = self.runtime.block_on(self.controller.delete(id));
        self.after_controller_call();
    }

    /// Swap the selected task with its neighbour in server order. Only
    /// meaningful while the view shows the server order. The server drops a
    /// task moved downwards after its target, so a swap always moves the lower
    /// of the two rows up.
    fn move_selected(&mut self, down: bool) {
        if self.controller.filter().sort != SortKey::Manual {
            self.set_status_info(STATUS_REORDER_MANUAL);
            return;
        }
        let Some(task) = self.selected_task() else {
            self.set_status_info("Nothing to move");
            return;
        };
        let id = task.id.clone();
        let target_idx = if down {
            self.selected + 1
        } else {
            match self.selected.checked_sub(1) {
                Some(idx) => idx,
                None => return,
            }
        };
        let Some(target_id) = self.view.get(target_idx).map(|task| task.id.clone()) else {
            return;
        };

        let (moved, onto) = if down {
            (&target_id, &id)
        } else {
            (&id, &target_id)
        };
        let result = self
            .runtime
            .block_on(self.controller.reorder(moved, onto));
        self.after_controller_call();
        if result.is_ok() {
            self.select_task_by_id(&id);
        }
    }

    fn check_health(&mut self) {
        let _ = self.runtime.block_on(self.controller.check_health());
        self.drain_notices();
    }

    fn create_backup(&mut self) {
        let _ = self.runtime.block_on(self.controller.backup());
        self.drain_notices();
    }

    fn show_selected_details(&mut self) {
        match self.selected_task().cloned() {
            Some(task) => {
                self.inspect_task = Some(task);
                self.input_mode = InputMode::Inspect;
                self.set_status_info(STATUS_VIEW_DETAILS);
            }
            None => self.set_status_info("Nothing to inspect"),
        }
    }

    fn show_help_overlay(&mut self) {
        self.inspect_task = None;
        self.input_mode = InputMode::Help;
        self.set_status_info(STATUS_HELP);
    }

    fn toggle_calendar(&mut self) {
        self.calendar = !self.calendar;
        let text = if self.calendar {
            "Calendar view: tasks grouped by due date"
        } else {
            "List view"
        };
        self.set_status_info(text);
    }

    pub(crate) fn set_status_info<T: Into<String>>(&mut self, message: T) {
        self.status = Some(StatusMessage::new(message, StatusKind::Info));
    }

    pub(crate) fn set_status_error<T: Into<String>>(&mut self, message: T) {
        self.status = Some(StatusMessage::new(message, StatusKind::Error));
    }
}

/// The edit prompt is a single line, so a multi-line description comes back
/// with its line breaks flattened. Keep the original text when nothing else
/// in it changed.
fn keep_multiline_description(draft: &mut TaskDraft, original: &TaskRecord) {
    let Some(previous) = original.description.as_deref() else {
        return;
    };
    let flattened = previous.replace(['\n', '\r'], " ");
    if draft.description.as_deref() == Some(flattened.trim()) {
        draft.description = Some(previous.trim().to_string());
    }
}
