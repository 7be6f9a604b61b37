use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use rstest::rstest;
use tasklist_core::config::DEFAULT_API_URL;
use tasklist_core::{
    Category, GatewayOp, MemoryGateway, Priority, SortKey, StatusFilter, TaskDraft, TaskGateway,
    TaskRecord,
};
use tempfile::TempDir;
use tokio::runtime::Runtime;

use super::super::filters::{
    filter_summary, FilterColumn, FilterFacets, FilterOverlay, FilterSelection,
};
use super::{App, ConfirmChoice, InputMode, StatusKind};
use crate::config::AppConfig;
use crate::tui::constants::STATUS_REORDER_MANUAL;
use crate::tui::helpers::{centered_rect, format_task_detail_entries, progress_bar};

struct Harness {
    app: App<MemoryGateway>,
    gateway: Arc<MemoryGateway>,
    _dir: TempDir,
}

fn draft(title: &str, category: Category, priority: Priority) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: None,
        category,
        priority,
        progress: 0,
        due: None,
    }
}

fn harness(drafts: Vec<TaskDraft>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::new(DEFAULT_API_URL, dir.path().to_path_buf()).unwrap();
    let runtime = Runtime::new().unwrap();
    let gateway = Arc::new(MemoryGateway::new());
    runtime.block_on(async {
        for draft in &drafts {
            gateway.create_task(draft).await.unwrap();
        }
    });

    let mut app = App::new(config, gateway.clone(), runtime);
    app.load();
    Harness {
        app,
        gateway,
        _dir: dir,
    }
}

fn sample() -> Harness {
    harness(vec![
        draft("Write report", Category::Work, Priority::High),
        draft("Buy bread", Category::Shopping, Priority::Low),
        draft("Read chapter", Category::Study, Priority::Medium),
    ])
}

fn press(app: &mut App<MemoryGateway>, code: KeyCode) {
    app.on_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
}

fn type_text(app: &mut App<MemoryGateway>, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn status_text(app: &App<MemoryGateway>) -> Option<&str> {
    app.status.as_ref().map(|status| status.text.as_str())
}

fn titles(view: &[TaskRecord]) -> Vec<&str> {
    view.iter().map(|task| task.title.as_str()).collect()
}

#[test]
fn load_populates_view_and_stats() {
    let h = sample();
    assert_eq!(h.app.view.len(), 3);
    assert_eq!(h.app.controller.stats().total, 3);
    assert!(!h.app.loading);
    assert_eq!(h.app.table_state.selected(), Some(0));
}

#[test]
fn add_flow_creates_task_and_selects_it() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('a'));
    assert_eq!(h.app.input_mode, InputMode::Add);

    type_text(&mut h.app, "Buy milk #shopping p:high");
    press(&mut h.app, KeyCode::Enter);

    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert!(h.app.input.as_str().is_empty());
    let created = h
        .gateway
        .tasks()
        .into_iter()
        .find(|task| task.title == "Buy milk")
        .expect("task created");
    assert_eq!(created.category, Category::Shopping);
    assert_eq!(created.priority, Priority::High);
    assert_eq!(h.app.selected_task().map(|t| t.id.as_str()), Some(created.id.as_str()));
    assert_eq!(status_text(&h.app), Some("Task created"));
}

#[test]
fn add_with_bad_token_keeps_the_form_open() {
    let mut h = sample();
    let creates_before = h.gateway.requests(GatewayOp::Create);

    press(&mut h.app, KeyCode::Char('a'));
    type_text(&mut h.app, "Thing p:urgent");
    press(&mut h.app, KeyCode::Enter);

    assert_eq!(h.app.input_mode, InputMode::Add);
    assert_eq!(h.app.input.as_str(), "Thing p:urgent");
    assert_eq!(h.app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    assert_eq!(h.gateway.requests(GatewayOp::Create), creates_before);
}

#[test]
fn add_failure_keeps_the_form_and_shows_server_message() {
    let mut h = sample();
    h.gateway.fail_next(GatewayOp::Create, "Title is required");

    press(&mut h.app, KeyCode::Char('a'));
    type_text(&mut h.app, "Anything");
    press(&mut h.app, KeyCode::Enter);

    assert_eq!(h.app.input_mode, InputMode::Add);
    assert_eq!(status_text(&h.app), Some("Title is required"));
    assert_eq!(h.gateway.tasks().len(), 3);
}

#[test]
fn space_completes_selected_task() {
    let mut h = sample();
    let id = h.app.selected_task().unwrap().id.clone();

    press(&mut h.app, KeyCode::Char(' '));

    let stored = h.gateway.tasks().into_iter().find(|t| t.id == id).unwrap();
    assert!(stored.completed);
    assert_eq!(stored.progress, 100);
    assert_eq!(status_text(&h.app), Some("Task completed"));
    assert_eq!(h.app.controller.stats().completed, 1);
}

#[test]
fn failed_toggle_reverts_the_row() {
    let mut h = sample();
    h.gateway.fail_next(GatewayOp::Update, "Server is busy");

    press(&mut h.app, KeyCode::Char(' '));

    assert!(!h.app.view[0].completed);
    assert!(h.gateway.tasks().iter().all(|task| !task.completed));
    assert_eq!(status_text(&h.app), Some("Server is busy"));
    assert_eq!(h.app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
}

#[test]
fn tabs_switch_status_filter() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char(' '));
    assert_eq!(h.app.view.len(), 3);

    press(&mut h.app, KeyCode::Tab);
    assert_eq!(h.app.controller.filter().status, StatusFilter::Active);
    assert_eq!(h.app.view.len(), 2);

    press(&mut h.app, KeyCode::Tab);
    assert_eq!(h.app.controller.filter().status, StatusFilter::Completed);
    assert_eq!(titles(&h.app.view), vec!["Write report"]);

    press(&mut h.app, KeyCode::Tab);
    assert_eq!(h.app.controller.filter().status, StatusFilter::All);

    press(&mut h.app, KeyCode::BackTab);
    assert_eq!(h.app.controller.filter().status, StatusFilter::Completed);
}

#[test]
fn sort_cycles_through_every_key() {
    let mut h = sample();
    assert_eq!(h.app.controller.filter().sort, SortKey::Due);

    press(&mut h.app, KeyCode::Char('o'));
    assert_eq!(h.app.controller.filter().sort, SortKey::Priority);
    assert_eq!(status_text(&h.app), Some("Sorted by Priority"));
    assert_eq!(
        titles(&h.app.view),
        vec!["Write report", "Read chapter", "Buy bread"]
    );

    press(&mut h.app, KeyCode::Char('o'));
    assert_eq!(h.app.controller.filter().sort, SortKey::Created);
    assert_eq!(h.app.view[0].title, "Read chapter");

    press(&mut h.app, KeyCode::Char('o'));
    press(&mut h.app, KeyCode::Char('o'));
    assert_eq!(h.app.controller.filter().sort, SortKey::Due);
}

#[test]
fn selection_follows_task_across_sort_changes() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('j'));
    assert_eq!(h.app.selected_task().unwrap().title, "Buy bread");

    press(&mut h.app, KeyCode::Char('o'));
    assert_eq!(h.app.selected_task().unwrap().title, "Buy bread");
    assert_eq!(h.app.selected, 2);
}

#[test]
fn filter_overlay_applies_category() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('f'));
    assert_eq!(h.app.input_mode, InputMode::Filter);

    press(&mut h.app, KeyCode::Right);
    // Row 0 is "All categories", Shopping is the third category.
    press(&mut h.app, KeyCode::Down);
    press(&mut h.app, KeyCode::Down);
    press(&mut h.app, KeyCode::Down);
    press(&mut h.app, KeyCode::Char(' '));
    press(&mut h.app, KeyCode::Enter);

    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert_eq!(h.app.controller.filter().category, Some(Category::Shopping));
    assert_eq!(titles(&h.app.view), vec!["Buy bread"]);
    assert_eq!(status_text(&h.app), Some("Applied filters: #shopping"));
}

#[test]
fn filter_overlay_escape_restores_previous_selection() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('f'));
    press(&mut h.app, KeyCode::Down);
    press(&mut h.app, KeyCode::Char(' '));
    press(&mut h.app, KeyCode::Esc);

    assert_eq!(h.app.controller.filter().status, StatusFilter::All);
    assert!(h.app.filter_overlay.is_none());
}

#[test]
fn delete_requires_confirmation() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('x'));
    assert_eq!(h.app.input_mode, InputMode::ConfirmDelete);
    assert_eq!(h.app.confirm_choice, ConfirmChoice::No);

    press(&mut h.app, KeyCode::Enter);
    assert_eq!(h.gateway.tasks().len(), 3);
    assert_eq!(status_text(&h.app), Some("Deletion cancelled"));

    press(&mut h.app, KeyCode::Char('x'));
    press(&mut h.app, KeyCode::Left);
    press(&mut h.app, KeyCode::Enter);
    assert_eq!(h.gateway.tasks().len(), 2);
    assert_eq!(h.app.view.len(), 2);
    assert_eq!(status_text(&h.app), Some("Task deleted"));
}

#[test]
fn reorder_needs_manual_sort() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('J'));
    assert_eq!(status_text(&h.app), Some(STATUS_REORDER_MANUAL));
    assert_eq!(h.gateway.requests(GatewayOp::Reorder), 0);

    h.app.set_sort(SortKey::Manual);
    press(&mut h.app, KeyCode::Char('J'));

    assert_eq!(
        titles(&h.gateway.tasks()),
        vec!["Buy bread", "Write report", "Read chapter"]
    );
    assert_eq!(h.app.selected_task().unwrap().title, "Write report");
    assert_eq!(h.app.selected, 1);
}

#[test]
fn palette_runs_commands() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('/'));
    assert_eq!(h.app.input_mode, InputMode::Command);
    assert_eq!(h.app.input.as_str(), "/");

    type_text(&mut h.app, "view active");
    h.app.run_command();
    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert_eq!(h.app.controller.filter().status, StatusFilter::Active);

    press(&mut h.app, KeyCode::Char('/'));
    type_text(&mut h.app, "bogus");
    press(&mut h.app, KeyCode::Enter);
    assert_eq!(status_text(&h.app), Some("Unknown command: bogus (try /help)"));
}

#[test]
fn palette_done_uses_explicit_id() {
    let mut h = sample();
    let id = h.gateway.tasks()[2].id.clone();

    press(&mut h.app, KeyCode::Char('/'));
    type_text(&mut h.app, &format!("done {id}"));
    h.app.run_command();

    let stored = h.gateway.tasks().into_iter().find(|t| t.id == id).unwrap();
    assert!(stored.completed);
}

#[test]
fn palette_add_with_text_creates_directly() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('/'));
    type_text(&mut h.app, "add Call mom #personal");
    h.app.run_command();

    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert!(h.gateway.tasks().iter().any(|t| t.title == "Call mom"));
}

#[test]
fn search_applies_after_typing_pauses() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('s'));
    assert_eq!(h.app.input_mode, InputMode::Search);

    type_text(&mut h.app, "bread");
    h.app.on_tick();
    assert_eq!(h.app.view.len(), 3);

    std::thread::sleep(Duration::from_millis(450));
    h.app.on_tick();
    assert_eq!(h.app.controller.filter().search, "bread");
    assert_eq!(titles(&h.app.view), vec!["Buy bread"]);
}

#[test]
fn search_escape_restores_previous_text() {
    let mut h = sample();
    h.app.apply_search_now("report".into());

    press(&mut h.app, KeyCode::Char('s'));
    assert_eq!(h.app.input.as_str(), "report");
    press(&mut h.app, KeyCode::Backspace);
    press(&mut h.app, KeyCode::Esc);

    assert_eq!(h.app.controller.filter().search, "report");
    assert_eq!(titles(&h.app.view), vec!["Write report"]);
}

#[test]
fn edit_prefills_capture_text_and_saves() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char('e'));
    assert_eq!(h.app.input_mode, InputMode::Edit);
    assert_eq!(h.app.input.as_str(), "Write report #work p:high");

    press(&mut h.app, KeyCode::End);
    type_text(&mut h.app, " prog:40");
    press(&mut h.app, KeyCode::Enter);

    assert_eq!(h.app.input_mode, InputMode::Normal);
    let stored = &h.gateway.tasks()[0];
    assert_eq!(stored.progress, 40);
    assert_eq!(stored.priority, Priority::High);
    assert_eq!(status_text(&h.app), Some("Task updated"));
}

#[test]
fn unchanged_edit_keeps_token_like_text() {
    let mut task = draft("Fix issue #42 -- soon", Category::Work, Priority::High);
    task.description = Some("line one\nline two p:high".into());
    task.progress = 30;
    let mut h = harness(vec![task]);

    press(&mut h.app, KeyCode::Char('e'));
    press(&mut h.app, KeyCode::Enter);

    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert_eq!(status_text(&h.app), Some("Task updated"));
    let stored = &h.gateway.tasks()[0];
    assert_eq!(stored.title, "Fix issue #42 -- soon");
    assert_eq!(stored.description.as_deref(), Some("line one\nline two p:high"));
    assert_eq!(stored.category, Category::Work);
    assert_eq!(stored.priority, Priority::High);
    assert_eq!(stored.progress, 30);
}

#[test]
fn background_refresh_picks_up_server_changes() {
    let mut h = sample();
    h.app
        .runtime
        .block_on(h.gateway.create_task(&draft("Added elsewhere", Category::Other, Priority::Low)))
        .unwrap();

    press(&mut h.app, KeyCode::Char('r'));
    assert!(h.app.loading);

    for _ in 0..50 {
        std::thread::sleep(Duration::from_millis(10));
        h.app.on_tick();
        if !h.app.loading {
            break;
        }
    }
    assert!(!h.app.loading);
    assert_eq!(h.app.view.len(), 4);
}

#[test]
fn details_overlay_opens_and_closes() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Enter);
    assert_eq!(h.app.input_mode, InputMode::Inspect);
    assert_eq!(h.app.inspect_task.as_ref().unwrap().title, "Write report");

    press(&mut h.app, KeyCode::Esc);
    assert_eq!(h.app.input_mode, InputMode::Normal);
    assert!(h.app.inspect_task.is_none());
}

fn render(app: &mut App<MemoryGateway>) -> String {
    let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
    terminal.draw(|f| app.draw(f)).unwrap();
    let buffer = terminal.backend().buffer().clone();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer.get(x, y).symbol());
        }
        text.push('\n');
    }
    text
}

#[test]
fn renders_rows_and_stats_panel() {
    let mut h = sample();
    let screen = render(&mut h.app);
    assert!(screen.contains("Write report"));
    assert!(screen.contains("Buy bread"));
    assert!(screen.contains("By priority"));
    assert!(screen.contains("Done today"));
}

#[test]
fn renders_distinct_empty_states() {
    let mut empty = harness(Vec::new());
    assert!(render(&mut empty.app).contains("No tasks yet"));

    let mut h = sample();
    h.app.apply_search_now("nothing like this".into());
    assert!(render(&mut h.app).contains("No tasks match the current filters"));
}

#[test]
fn renders_every_overlay_without_panicking() {
    let mut h = sample();
    for key in ['a', 'f', 'h', 'x', '/', 's'] {
        press(&mut h.app, KeyCode::Char(key));
        render(&mut h.app);
        press(&mut h.app, KeyCode::Esc);
    }
    press(&mut h.app, KeyCode::Enter);
    assert!(render(&mut h.app).contains("Task details"));
    press(&mut h.app, KeyCode::Esc);

    press(&mut h.app, KeyCode::Char('c'));
    assert!(render(&mut h.app).contains("without a due date"));
}

#[test]
fn centered_rect_keeps_within_bounds() {
    let area = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 24,
    };
    let rect = centered_rect(40, 10, area);
    assert!(rect.x >= area.x);
    assert!(rect.y >= area.y);
    assert_eq!(rect.width, 40);
    assert_eq!(rect.height, 10);

    let clipped = centered_rect(200, 50, area);
    assert_eq!(clipped, area);
}

#[rstest]
#[case(0, "░░░░░░░░░░   0%")]
#[case(45, "█████░░░░░  45%")]
#[case(100, "██████████ 100%")]
fn progress_bar_rounds_to_ten_cells(#[case] progress: u8, #[case] expected: &str) {
    assert_eq!(progress_bar(progress), expected);
}

#[test]
fn detail_entries_skip_empty_fields() {
    let h = sample();
    let task = &h.app.view[0];
    let keys: Vec<String> = format_task_detail_entries(task, chrono::Utc::now())
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(
        keys,
        vec!["Title", "ID", "Status", "Category", "Priority", "Progress", "Created"]
    );
}

#[test]
fn filter_summary_lists_non_default_parts() {
    let h = sample();
    assert_eq!(filter_summary(h.app.controller.filter()), None);

    let mut config = h.app.controller.filter().clone();
    config.status = StatusFilter::Active;
    config.category = Some(Category::Work);
    config.search = "q".into();
    config.sort = SortKey::Priority;
    assert_eq!(
        filter_summary(&config).as_deref(),
        Some("status:active | #work | \"q\" | sort:priority")
    );
}

#[test]
fn filter_facets_count_status_and_category() {
    let mut h = sample();
    press(&mut h.app, KeyCode::Char(' '));
    let facets = FilterFacets::from_tasks(h.app.controller.tasks());

    assert_eq!(facets.status_count(StatusFilter::All), 3);
    assert_eq!(facets.status_count(StatusFilter::Active), 2);
    assert_eq!(facets.status_count(StatusFilter::Completed), 1);
    assert_eq!(facets.category_count(Category::Shopping), 1);
    assert_eq!(facets.category_count(Category::Personal), 0);
}

#[test]
fn filter_overlay_category_toggle_falls_back_to_all() {
    let mut overlay = FilterOverlay::new(FilterFacets::default(), FilterSelection::default());
    overlay.column = FilterColumn::Category;
    overlay.row_positions[FilterColumn::Category.index()] = 1;

    overlay.toggle_current();
    assert_eq!(overlay.working.category, Some(Category::Work));

    overlay.toggle_current();
    assert_eq!(overlay.working.category, None);
}

#[test]
fn filter_overlay_clear_all_resets_state() {
    let active = FilterSelection {
        status: StatusFilter::Completed,
        category: Some(Category::Study),
        sort: SortKey::Manual,
    };
    let mut overlay = FilterOverlay::new(FilterFacets::default(), active);
    assert_eq!(overlay.row_positions, [2, 4, 3]);

    overlay.clear_all();

    assert_eq!(overlay.working, FilterSelection::default());
    assert_eq!(overlay.row_positions, [0, 0, 0]);
    assert_eq!(overlay.cancel(), active);
}
