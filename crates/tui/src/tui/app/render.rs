use std::cmp::{min, Ordering};

use chrono::{DateTime, Local, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap,
};
use ratatui::Frame;
use tasklist_core::display::{category_info, priority_info};
use tasklist_core::engine::group_by_due_date;
use tasklist_core::{Category, Priority, SortKey, StatusFilter, TaskGateway, TaskRecord, Tone};

use crate::tui::constants::APP_VERSION;
use crate::tui::filters::{filter_summary, FilterColumn, FilterOverlay};
use crate::tui::helpers::{
    bold, build_help_lines, centered_rect, format_opt_datetime, format_task_detail_entries,
    inset_rect, muted, panel, progress_bar, tone_color, BG_ACCENT, BG_BASE, BG_PANEL, FG_ACCENT,
};

use super::{App, ConfirmChoice, InputMode, TABS};

const STATS_PANEL_WIDTH: u16 = 30;

const CAPTURE_HINTS: [(&str, &str); 6] = [
    ("#category", "work, personal, shopping, study, other"),
    ("p:LEVEL", "Priority: low, medium, high"),
    ("due:DATE", "today, tomorrow, fri, +3d, 2025-01-20, 18:00"),
    ("prog:N", "Progress 0-100"),
    ("-- text", "Everything after -- becomes the description"),
    ("", "Example: Pay rent #personal p:high due:+2d"),
];

impl<G: TaskGateway + 'static> App<G> {
    pub(crate) fn draw(&mut self, f: &mut Frame<'_>) {
        let size = f.size();
        f.render_widget(Clear, size);
        f.render_widget(Block::default().style(Style::default().bg(BG_BASE)), size);
        let [header, tabs, body, footer] = split_column(
            size,
            [
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(2),
            ],
        );

        self.draw_header(f, header);
        self.draw_tabs(f, tabs);
        self.draw_body(f, body);
        self.draw_footer(f, footer);

        match self.input_mode {
            InputMode::Add | InputMode::Edit | InputMode::Command | InputMode::Search => {
                self.draw_prompt(f, size)
            }
            InputMode::Filter => self.draw_filter_picker(f, size),
            InputMode::Inspect => self.draw_details(f, size),
            InputMode::Help => draw_help(f, size),
            InputMode::ConfirmDelete => self.draw_delete_confirmation(f, size),
            InputMode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let [left, right] = split_row(
            area,
            [Constraint::Percentage(70), Constraint::Percentage(30)],
        );

        let mut spans = vec![
            Span::styled(format!(" tasklist v{APP_VERSION} "), bold(Color::Green)),
            Span::raw(format!("| {}  ", TABS[self.tab_index()].description)),
            Span::styled(self.config.api_url().to_string(), muted()),
        ];
        if let Some(summary) = filter_summary(self.controller.filter()) {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(format!("🔍 {summary}"), bold(Color::Yellow)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), left);

        let stats = self.controller.stats();
        let mut counters = Vec::new();
        if self.loading {
            counters.push(Span::styled("Loading… ", Style::default().fg(Color::Cyan)));
        }
        counters.push(Span::styled(
            format!(
                "{} total · {} active · {} done · ",
                stats.total, stats.active, stats.completed
            ),
            Style::default().fg(Color::Gray),
        ));
        let overdue_style = if stats.overdue > 0 {
            bold(tone_color(Tone::Red))
        } else {
            muted()
        };
        counters.push(Span::styled(
            format!("{} overdue ", stats.overdue),
            overdue_style,
        ));
        f.render_widget(
            Paragraph::new(Line::from(counters)).alignment(Alignment::Right),
            right,
        );
    }

    fn draw_tabs(&self, f: &mut Frame<'_>, area: Rect) {
        let title = format!("Views • sort: {}", self.controller.filter().sort.label());
        let labels: Vec<Line> = TABS.iter().map(|tab| Line::from(tab.label)).collect();
        let tabs = Tabs::new(labels)
            .select(self.tab_index())
            .block(panel(Some(&title)))
            .highlight_style(bold(Color::Green).bg(BG_ACCENT));
        f.render_widget(tabs, area);
    }

    fn draw_body(&mut self, f: &mut Frame<'_>, area: Rect) {
        let main = if area.width >= STATS_PANEL_WIDTH * 3 {
            let [main, side] = split_row(
                area,
                [Constraint::Min(40), Constraint::Length(STATS_PANEL_WIDTH)],
            );
            self.draw_stats(f, side);
            main
        } else {
            area
        };

        if self.view.is_empty() {
            self.draw_empty_state(f, main);
        } else if self.calendar {
            self.draw_calendar(f, main);
        } else {
            self.draw_task_table(f, main);
        }
    }

    fn draw_empty_state(&self, f: &mut Frame<'_>, area: Rect) {
        let frame = panel(None);
        let inner = frame.inner(area);
        f.render_widget(frame, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let lines = self.empty_state_lines();
        let height = (lines.len() as u16 + 2).min(inner.height);
        let content = centered_rect(inner.width.min(80), height, inner);
        f.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center),
            content,
        );
    }

    /// An empty server collection and a filter that hides everything get
    /// different messages.
    fn empty_state_lines(&self) -> Vec<Line<'static>> {
        let has_tasks = !self.controller.tasks().is_empty();
        let (heading, hints): (&str, [&str; 3]) = if has_tasks {
            (
                "No tasks match the current filters",
                [
                    "Press 'f' to adjust the filters or run '/filter clear'.",
                    "Press 's' to change the search text.",
                    "Use Tab to switch between All, Active and Completed.",
                ],
            )
        } else {
            (
                "No tasks yet",
                [
                    "Press 'a' to add a task.",
                    "Use '/' to explore commands.",
                    "Press 'r' to reload from the server.",
                ],
            )
        };

        let mut lines = vec![
            Line::from(Span::styled(heading, bold(Color::Green))),
            Line::default(),
        ];
        lines.extend(
            hints
                .into_iter()
                .map(|hint| Line::from(Span::styled(hint, bold(Color::Gray)))),
        );
        if !has_tasks {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!(
                    "Connected to {} (change with --api-url or TASKLIST_API_URL).",
                    self.config.api_url()
                ),
                muted(),
            )));
        }
        lines
    }

    fn draw_task_table(&mut self, f: &mut Frame<'_>, area: Rect) {
        let header = Row::new([
            "", "Title", "Category", "Priority", "Progress", "Due", "Remaining",
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));
        let now = Utc::now();
        let rows: Vec<Row> = self.view.iter().map(|task| task_row(task, now)).collect();
        let widths = [
            Constraint::Length(3),
            Constraint::Percentage(34),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(15),
            Constraint::Length(16),
            Constraint::Min(12),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(panel(None))
            .highlight_style(bold(Color::Yellow).bg(BG_ACCENT))
            .highlight_symbol("▶ ");
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_calendar(&self, f: &mut Frame<'_>, area: Rect) {
        let today = Local::now().date_naive();
        let selected_id = self.selected_task().map(|task| task.id.as_str());
        let mut lines: Vec<Line> = Vec::new();

        for group in group_by_due_date(&self.view) {
            let day_color = match group.date.cmp(&today) {
                Ordering::Less => tone_color(Tone::Red),
                Ordering::Equal => tone_color(Tone::Green),
                Ordering::Greater => FG_ACCENT,
            };
            lines.push(Line::from(Span::styled(
                group.date.format("%a %Y-%m-%d").to_string(),
                bold(day_color),
            )));
            for task in &group.tasks {
                lines.push(calendar_entry(task, selected_id == Some(task.id.as_str())));
            }
        }

        let undated = self.view.iter().filter(|task| task.due.is_none()).count();
        if undated > 0 {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!("{undated} task(s) without a due date are not shown"),
                muted(),
            )));
        }

        f.render_widget(
            Paragraph::new(lines)
                .block(panel(Some("Calendar")))
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn draw_stats(&self, f: &mut Frame<'_>, area: Rect) {
        let stats = self.controller.stats();
        let counter = |label: &'static str, value: usize, style: Style| {
            Line::from(vec![
                Span::styled(format!("{label:<12}"), Style::default().fg(Color::Gray)),
                Span::styled(value.to_string(), style),
            ])
        };

        let mut lines = vec![
            counter("Total", stats.total, Style::default()),
            counter("Active", stats.active, Style::default()),
            counter("Completed", stats.completed, Style::default()),
            counter(
                "Overdue",
                stats.overdue,
                Style::default().fg(tone_color(Tone::Red)),
            ),
            counter("Done today", stats.completed_today, Style::default()),
            Line::default(),
            Line::from(Span::styled("By priority", bold(FG_ACCENT))),
        ];
        for priority in Priority::ALL {
            let count = match priority {
                Priority::High => stats.by_priority.high,
                Priority::Medium => stats.by_priority.medium,
                Priority::Low => stats.by_priority.low,
            };
            let badge = priority_info(Some(priority));
            lines.push(share_line(badge.label, count, stats.share(count), badge.tone));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled("By category", bold(FG_ACCENT))));
        for category in Category::ALL {
            let count = stats.by_category.count(category);
            let badge = category_info(Some(category));
            lines.push(share_line(badge.label, count, stats.share(count), badge.tone));
        }

        f.render_widget(Paragraph::new(lines).block(panel(Some("Stats"))), area);
    }

    fn draw_footer(&self, f: &mut Frame<'_>, area: Rect) {
        let [status_row, help_row] =
            split_column(area, [Constraint::Length(1), Constraint::Length(1)]);

        let status = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.style())),
            None => Line::from("Ready"),
        };
        f.render_widget(Paragraph::new(status), status_row);

        let help = match self.input_mode {
            InputMode::Normal => {
                "tab views · j/k move · enter details · a add · e edit · space done · x delete · J/K reorder · s search · f filter · o sort · c calendar · / command · r refresh · h help · q quit"
            }
            InputMode::Add => "Enter add · Esc cancel",
            InputMode::Edit => "Enter save · Esc cancel",
            InputMode::Command => "↑/↓ choose · Tab complete · Enter run · Esc cancel",
            InputMode::Search => "Type to search · Enter keep · Esc restore",
            InputMode::Filter => {
                "←/→ column · ↑/↓ row · Space select · C reset · Enter apply · Esc cancel"
            }
            InputMode::Inspect | InputMode::Help => "Enter/Esc close",
            InputMode::ConfirmDelete => "←/→ choose · y delete · Enter confirm · Esc cancel",
        };
        f.render_widget(Paragraph::new(Span::styled(help, muted())), help_row);
    }

    /// Text prompt shared by add, edit, search and the command palette.
    fn draw_prompt(&self, f: &mut Frame<'_>, area: Rect) {
        let (title, extra) = match self.input_mode {
            InputMode::Add => ("Add task", CAPTURE_HINTS.len() as u16 + 1),
            InputMode::Edit => ("Edit task", CAPTURE_HINTS.len() as u16 + 1),
            InputMode::Command => ("Command", self.suggestions.len().min(8) as u16 + 1),
            _ => ("Search", 0),
        };
        let width = min(area.width.saturating_sub(10), 80);
        let popup = centered_rect(width, 3 + extra, area);
        f.render_widget(Clear, popup);
        let [input_row, below] =
            split_column(popup, [Constraint::Length(3), Constraint::Min(0)]);

        let frame = panel(Some(title));
        let field = frame.inner(input_row);
        f.render_widget(frame, input_row);
        f.render_widget(Paragraph::new(self.input.as_str()), field);
        if field.width > 0 {
            let column = (self.input.cursor_column() as u16).min(field.width - 1);
            f.set_cursor(field.x + column, field.y);
        }

        f.render_widget(Block::default().style(Style::default().bg(BG_PANEL)), below);
        match self.input_mode {
            InputMode::Command => self.draw_suggestions(f, below),
            InputMode::Add | InputMode::Edit => draw_capture_hints(f, below),
            _ => {}
        }
    }

    fn draw_suggestions(&self, f: &mut Frame<'_>, area: Rect) {
        let mut lines = vec![Line::from(Span::styled(
            "Suggestions",
            bold(Color::DarkGray),
        ))];
        lines.extend(self.suggestions.iter().enumerate().map(|(i, suggestion)| {
            let fill_style = if i == self.suggestion_index {
                bold(Color::Yellow)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Line::from(vec![
                Span::styled(suggestion.fill.clone(), fill_style),
                Span::raw("  "),
                Span::styled(suggestion.label.clone(), muted()),
            ])
        }));
        f.render_widget(Paragraph::new(lines), area);
    }

    fn draw_filter_picker(&self, f: &mut Frame<'_>, area: Rect) {
        let Some(overlay) = self.filter_overlay.as_ref() else {
            return;
        };

        let width = min(area.width.saturating_sub(10), 84);
        let height = min(area.height.saturating_sub(4), 12);
        let popup = centered_rect(width, height, area);
        f.render_widget(Clear, popup);

        let [columns_area, hint_row] =
            split_column(popup, [Constraint::Min(4), Constraint::Length(1)]);
        let columns = split_row(
            columns_area,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(40),
                Constraint::Percentage(30),
            ],
        );
        for (column, column_area) in FilterColumn::ALL.into_iter().zip(columns) {
            draw_filter_column(f, column_area, overlay, column);
        }

        f.render_widget(
            Paragraph::new(Span::styled(
                "Space selects · Enter applies · Esc cancels · C resets",
                bold(Color::DarkGray),
            ))
            .style(Style::default().bg(BG_PANEL)),
            hint_row,
        );
    }

    fn draw_details(&self, f: &mut Frame<'_>, area: Rect) {
        let Some(task) = self.inspect_task.as_ref() else {
            return;
        };

        let entries = format_task_detail_entries(task, Utc::now());
        let width = min(area.width.saturating_sub(20), 90).max(40);
        let height = (entries.len() as u16 + 6)
            .min(area.height.saturating_sub(2))
            .max(6);
        let inner = open_popup(f, area, width, height, panel(Some("Task details")));

        let rows: Vec<Row> = entries
            .into_iter()
            .map(|(key, value)| {
                Row::new(vec![
                    Cell::from(key).style(bold(FG_ACCENT)),
                    Cell::from(value),
                ])
            })
            .collect();
        let table =
            Table::new(rows, [Constraint::Length(12), Constraint::Min(20)]).column_spacing(2);
        f.render_widget(table, inset_rect(inner, 1));
    }

    fn draw_delete_confirmation(&self, f: &mut Frame<'_>, area: Rect) {
        let width = min(area.width.saturating_sub(20), 60).max(40);
        let frame = panel(Some("Delete task")).border_style(Style::default().fg(Color::Red));
        let inner = open_popup(f, area, width, 8, frame);

        let title = self
            .selected_task()
            .map(|task| task.title.as_str())
            .unwrap_or("selected task");
        let choice = |label: &'static str, active: bool, color: Color| {
            if active {
                Span::styled(label, bold(Color::Black).bg(color))
            } else {
                Span::styled(label, Style::default().fg(color))
            }
        };

        let lines = vec![
            Line::from(Span::styled(
                "This cannot be undone.",
                Style::default().fg(Color::Red),
            )),
            Line::from(format!("Delete '{title}'?")),
            Line::default(),
            Line::from(vec![
                choice("  Yes  ", self.confirm_choice == ConfirmChoice::Yes, Color::Red),
                Span::raw("    "),
                choice("  No  ", self.confirm_choice == ConfirmChoice::No, Color::Gray),
            ]),
        ];
        f.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center),
            inset_rect(inner, 1),
        );
    }
}

/// Clear a centered popup, draw its frame and return the area inside it.
fn open_popup(
    f: &mut Frame<'_>,
    area: Rect,
    width: u16,
    height: u16,
    frame: Block<'static>,
) -> Rect {
    let popup = centered_rect(width, height, area);
    f.render_widget(Clear, popup);
    let inner = frame.inner(popup);
    f.render_widget(frame, popup);
    inner
}

fn split_row<const N: usize>(area: Rect, constraints: [Constraint; N]) -> [Rect; N] {
    split(area, Direction::Horizontal, constraints)
}

fn split_column<const N: usize>(area: Rect, constraints: [Constraint; N]) -> [Rect; N] {
    split(area, Direction::Vertical, constraints)
}

fn split<const N: usize>(
    area: Rect,
    direction: Direction,
    constraints: [Constraint; N],
) -> [Rect; N] {
    let chunks = Layout::default()
        .direction(direction)
        .constraints(constraints)
        .split(area);
    std::array::from_fn(|i| chunks[i])
}

fn task_row(task: &TaskRecord, now: DateTime<Utc>) -> Row<'static> {
    let category = task.category_info();
    let priority = task.priority_info();

    let title_style = if task.completed {
        muted().add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    let (remaining, remaining_style) = if task.completed {
        (String::new(), Style::default())
    } else if task.is_overdue(now) {
        (task.time_remaining(now), bold(tone_color(Tone::Red)))
    } else {
        (task.time_remaining(now), Style::default().fg(Color::Gray))
    };

    Row::new(vec![
        Cell::from(if task.completed { "[x]" } else { "[ ]" }),
        Cell::from(task.title.clone()).style(title_style),
        Cell::from(category.label).style(Style::default().fg(tone_color(category.tone))),
        Cell::from(priority.label).style(Style::default().fg(tone_color(priority.tone))),
        Cell::from(progress_bar(task.progress))
            .style(Style::default().fg(tone_color(task.progress_tone()))),
        Cell::from(format_opt_datetime(task.due.as_ref())),
        Cell::from(remaining).style(remaining_style),
    ])
}

fn calendar_entry(task: &TaskRecord, selected: bool) -> Line<'static> {
    let time = task
        .due
        .map(|due| due.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default();
    let mark = if task.completed { "✓" } else { "·" };
    let badge = task.priority_info();

    let mut title_style = if task.completed {
        muted().add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    if selected {
        title_style = title_style.bg(BG_ACCENT).add_modifier(Modifier::BOLD);
    }

    Line::from(vec![
        Span::raw(format!("  {mark} {time} ")),
        Span::styled(task.title.clone(), title_style),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", badge.label),
            Style::default().fg(tone_color(badge.tone)),
        ),
    ])
}

fn share_line(label: &'static str, count: usize, share: u16, tone: Tone) -> Line<'static> {
    let color = tone_color(tone);
    Line::from(vec![
        Span::styled(format!("{label:<9}"), Style::default().fg(color)),
        Span::raw(format!("{count:>3} ")),
        Span::styled(
            "▇".repeat(usize::from(share / 10)),
            Style::default().fg(color),
        ),
        Span::styled(format!(" {share}%"), muted()),
    ])
}

fn draw_capture_hints(f: &mut Frame<'_>, area: Rect) {
    let rows: Vec<Row> = CAPTURE_HINTS
        .iter()
        .map(|(token, meaning)| {
            Row::new(vec![
                Cell::from(*token).style(Style::default().fg(Color::Cyan)),
                Cell::from(*meaning).style(muted()),
            ])
        })
        .collect();
    let table =
        Table::new(rows, [Constraint::Length(12), Constraint::Min(10)]).column_spacing(2);
    f.render_widget(table, inset_rect(area, 1));
}

fn draw_filter_column(
    f: &mut Frame<'_>,
    area: Rect,
    overlay: &FilterOverlay,
    column: FilterColumn,
) {
    let working = overlay.working;
    let check = |on: bool| if on { '✓' } else { ' ' };

    let items: Vec<ListItem> = match column {
        FilterColumn::Status => StatusFilter::ALL
            .iter()
            .map(|status| {
                ListItem::new(format!(
                    "({}) {} ({})",
                    check(working.status == *status),
                    status.as_str(),
                    overlay.facets.status_count(*status)
                ))
            })
            .collect(),
        FilterColumn::Category => {
            let all = ListItem::new(format!(
                "[{}] All categories",
                check(working.category.is_none())
            ));
            std::iter::once(all)
                .chain(Category::ALL.iter().map(|category| {
                    let badge = category_info(Some(*category));
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("[{}] ", check(working.category == Some(*category)))),
                        Span::styled(badge.label, Style::default().fg(tone_color(badge.tone))),
                        Span::raw(format!(" ({})", overlay.facets.category_count(*category))),
                    ]))
                }))
                .collect()
        }
        FilterColumn::Sort => SortKey::ALL
            .iter()
            .map(|sort| {
                ListItem::new(format!(
                    "({}) {}",
                    check(working.sort == *sort),
                    sort.label()
                ))
            })
            .collect(),
    };

    let mut state = ListState::default();
    let (title, border, background) = if overlay.column == column {
        let row = overlay.row_positions[column.index()];
        state.select(Some(row.min(items.len().saturating_sub(1))));
        (
            format!("▶ {}", column.title()),
            bold(Color::Yellow),
            Style::default().bg(BG_PANEL),
        )
    } else {
        (column.title().to_string(), muted(), muted().bg(BG_BASE))
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border),
        )
        .style(background)
        .highlight_style(bold(Color::Cyan))
        .highlight_symbol("▶ ");
    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_help(f: &mut Frame<'_>, area: Rect) {
    let entries = build_help_lines();
    let width = min(area.width.saturating_sub(10), 100);
    let height = min(entries.len() as u16 + 4, area.height.saturating_sub(2)).max(10);
    let inner = open_popup(f, area, width, height, panel(Some("Keyboard reference")));
    if inner.width < 3 || inner.height < 3 {
        return;
    }

    let lines: Vec<Line> = entries
        .into_iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{keys:<18}"), Style::default().fg(Color::Cyan)),
                Span::raw(action),
            ])
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }),
        inset_rect(inner, 1),
    );
}
