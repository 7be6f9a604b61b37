use std::cmp::min;

use chrono::{DateTime, Local, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};
use tasklist_core::{TaskRecord, Tone};

pub const BG_BASE: Color = Color::Rgb(14, 17, 23);
pub const BG_PANEL: Color = Color::Rgb(22, 26, 34);
pub const BG_ACCENT: Color = Color::Rgb(32, 37, 47);
pub const FG_ACCENT: Color = Color::Rgb(120, 161, 255);

const PROGRESS_CELLS: usize = 10;

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = min(width, area.width);
    let h = min(height, area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(w)) / 2,
        y: area.y + (area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}

pub fn inset_rect(area: Rect, padding: u16) -> Rect {
    if area.width == 0 || area.height == 0 {
        return area;
    }
    let px = padding.min(area.width / 2);
    let py = padding.min(area.height / 2);
    Rect {
        x: area.x + px,
        y: area.y + py,
        width: area.width.saturating_sub(px * 2),
        height: area.height.saturating_sub(py * 2),
    }
}

pub fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Blue => Color::Rgb(96, 165, 250),
        Tone::Purple => Color::Rgb(192, 132, 252),
        Tone::Pink => Color::Rgb(244, 114, 182),
        Tone::Indigo => Color::Rgb(129, 140, 248),
        Tone::Gray => Color::Gray,
        Tone::Green => Color::Rgb(74, 222, 128),
        Tone::Yellow => Color::Rgb(250, 204, 21),
        Tone::Red => Color::Rgb(248, 113, 113),
    }
}

/// Ten-cell bar followed by the percentage, e.g. `████░░░░░░  40%`.
pub fn progress_bar(progress: u8) -> String {
    let progress = usize::from(progress.min(100));
    let filled = (progress * PROGRESS_CELLS + 50) / 100;
    format!(
        "{}{} {:>3}%",
        "█".repeat(filled),
        "░".repeat(PROGRESS_CELLS - filled),
        progress
    )
}

pub fn format_task_detail_entries(task: &TaskRecord, now: DateTime<Utc>) -> Vec<(String, String)> {
    let mut entries = vec![
        (String::from("Title"), task.title.clone()),
        (String::from("ID"), task.id.clone()),
        (
            String::from("Status"),
            if task.completed { "completed" } else { "active" }.to_string(),
        ),
        (
            String::from("Category"),
            task.category_info().label.to_string(),
        ),
        (
            String::from("Priority"),
            task.priority_info().label.to_string(),
        ),
        (String::from("Progress"), format!("{}%", task.progress)),
    ];

    let due = format_opt_datetime(task.due.as_ref());
    if !due.is_empty() {
        entries.push((String::from("Due"), due));
        if !task.completed {
            entries.push((String::from("Remaining"), task.time_remaining(now)));
        }
    }
    entries.push((
        String::from("Created"),
        format_opt_datetime(Some(&task.created)),
    ));
    let updated = format_opt_datetime(task.updated.as_ref());
    if !updated.is_empty() {
        entries.push((String::from("Updated"), updated));
    }

    if let Some(description) = &task.description {
        if !description.trim().is_empty() {
            entries.push((String::from("Description"), description.clone()));
        }
    }

    entries
}

pub fn build_help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Tab / Shift+Tab", "Switch All / Active / Completed"),
        ("j / k or ↓ / ↑", "Move selection"),
        ("Home / End", "Jump to first / last task"),
        ("q", "Quit"),
        ("Enter", "Show task details"),
        ("h", "Toggle this help overlay"),
        ("a", "Add a task (quick capture)"),
        ("e", "Edit selected task"),
        ("Space", "Toggle completed"),
        ("x / Delete", "Delete task (with confirmation)"),
        ("s", "Search title and description"),
        ("f", "Open filter picker (status, category, sort)"),
        ("o", "Cycle sort order"),
        ("J / K", "Move task down / up (manual order)"),
        ("c", "Toggle calendar view"),
        ("/", "Command palette"),
        ("r", "Refresh from the server"),
        ("Esc", "Cancel/close overlays"),
    ]
}

pub fn accent_title(text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_owned(), bold(FG_ACCENT)))
}

pub fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Bordered panel on the panel background, optionally titled.
pub fn panel(title: Option<&str>) -> Block<'static> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(muted())
        .style(Style::default().bg(BG_PANEL));
    match title {
        Some(title) => block.title(accent_title(title)),
        None => block,
    }
}

pub fn format_opt_datetime(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|dt| {
            let local: DateTime<Local> = (*dt).into();
            local.format("%Y-%m-%d %H:%M").to_string()
        })
        .unwrap_or_default()
}
