//! Quick capture: one line of text with inline tokens turned into a [`TaskDraft`].
//!
//! Free words form the title. Recognised tokens are `#category`,
//! `p:low|medium|high`, `due:DATE` and `prog:N`; everything after a standalone
//! `--` becomes the description, kept verbatim. A leading backslash makes a
//! word literal, so `\#42` lands in the title as `#42`.

use chrono::{prelude::*, Duration, Months};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CaptureError;
use crate::model::{Category, Priority, TaskDraft, TaskRecord};
use crate::wire;

/// Normalized input for capturing a task from the CLI or the TUI form.
/// Explicit fields win over inline tokens found in `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureInput {
    pub text: Vec<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub due: Option<String>,
    pub progress: Option<u8>,
}

impl CaptureInput {
    pub fn from_line(line: &str) -> Self {
        Self {
            text: vec![line.to_string()],
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct InlineTokens {
    title_words: Vec<String>,
    description: Option<String>,
    category: Option<Category>,
    priority: Option<Priority>,
    due: Option<DateTime<Utc>>,
    progress: Option<u8>,
}

pub fn parse_capture(input: &CaptureInput) -> Result<TaskDraft, CaptureError> {
    parse_capture_at(input, Local::now())
}

pub(crate) fn parse_capture_at(
    input: &CaptureInput,
    now: DateTime<Local>,
) -> Result<TaskDraft, CaptureError> {
    let raw_text = input.text.join(" ");
    let inline = parse_inline_tokens(&raw_text, now)?;

    let title = inline.title_words.join(" ").trim().to_string();
    if title.is_empty() {
        return Err(CaptureError::EmptyTitle);
    }

    let due = match input.due.as_deref() {
        Some(spec) => Some(parse_date_spec_at(spec, now)?),
        None => inline.due,
    };

    let progress = match input.progress {
        Some(value) if value > 100 => {
            return Err(CaptureError::InvalidProgress(value.to_string()))
        }
        Some(value) => value,
        None => inline.progress.unwrap_or(0),
    };

    let description = input
        .description
        .as_deref()
        .or(inline.description.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);

    Ok(TaskDraft {
        title,
        description,
        category: input.category.or(inline.category).unwrap_or_default(),
        priority: input.priority.or(inline.priority).unwrap_or_default(),
        progress,
        due,
    })
}

fn parse_inline_tokens(text: &str, now: DateTime<Local>) -> Result<InlineTokens, CaptureError> {
    static SEPARATOR_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?:^|\s)--(?:\s|$)").expect("valid regex"));

    let mut result = InlineTokens::default();
    let head = match SEPARATOR_RE.find(text) {
        Some(mat) => {
            result.description = Some(text[mat.end()..].to_string());
            &text[..mat.start()]
        }
        None => text,
    };

    for raw_piece in head.split_whitespace() {
        if let Some(literal) = raw_piece.strip_prefix('\\') {
            result.title_words.push(literal.to_string());
            continue;
        }

        let (piece, trailing) = strip_trailing_punctuation(raw_piece);
        if let Some(label) = piece.strip_prefix('#').filter(|label| !label.is_empty()) {
            result.category = Some(parse_category(label)?);
        } else if let Some(spec) = piece.strip_prefix("p:") {
            result.priority = Some(parse_priority(spec)?);
        } else if let Some(spec) = piece.strip_prefix("due:") {
            result.due = Some(parse_date_spec_at(spec, now)?);
        } else if let Some(spec) = piece.strip_prefix("prog:") {
            result.progress = Some(parse_progress(spec)?);
        } else {
            result.title_words.push(raw_piece.to_string());
            continue;
        }

        if let Some(rest) = trailing {
            push_trailing(&mut result.title_words, rest);
        }
    }

    Ok(result)
}

fn parse_category(label: &str) -> Result<Category, CaptureError> {
    label
        .parse()
        .map_err(|_| CaptureError::UnknownCategory(label.to_string()))
}

fn parse_priority(label: &str) -> Result<Priority, CaptureError> {
    label
        .parse()
        .map_err(|_| CaptureError::UnknownPriority(label.to_string()))
}

fn parse_progress(spec: &str) -> Result<u8, CaptureError> {
    let trimmed = spec.trim().trim_end_matches('%');
    match trimmed.parse::<u8>() {
        Ok(value) if value <= 100 => Ok(value),
        _ => Err(CaptureError::InvalidProgress(spec.to_string())),
    }
}

fn strip_trailing_punctuation(input: &str) -> (String, Option<String>) {
    static PUNCT_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[[:punct:]]+$").expect("valid regex"));
    if let Some(mat) = PUNCT_RE.find(input) {
        let token = input[..mat.start()].to_string();
        let trailing = input[mat.start()..].to_string();
        (token, Some(trailing))
    } else {
        (input.to_string(), None)
    }
}

fn push_trailing(words: &mut Vec<String>, trailing: String) {
    if let Some(last) = words.last_mut() {
        last.push_str(&trailing);
    }
}

/// Words the parser would read as a token, the separator or an escape.
fn needs_escape(word: &str) -> bool {
    word == "--"
        || word.starts_with('#')
        || word.starts_with('\\')
        || ["p:", "due:", "prog:"]
            .iter()
            .any(|prefix| word.starts_with(prefix))
}

/// Render a record back into capture text, used to prefill the edit form.
/// Title words that look like tokens are escaped, so parsing the result
/// yields the record's editable fields (title whitespace is collapsed).
pub fn compose_capture(record: &TaskRecord) -> String {
    let title = record
        .title
        .split_whitespace()
        .map(|word| {
            if needs_escape(word) {
                format!("\\{word}")
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let mut parts = vec![title];
    if record.category != Category::Other {
        parts.push(format!("#{}", record.category));
    }
    if record.priority != Priority::Low {
        parts.push(format!("p:{}", record.priority));
    }
    if let Some(due) = record.due {
        if due.second() == 0 && due.nanosecond() == 0 {
            let local = due.with_timezone(&Local);
            parts.push(format!("due:{}", local.format("%Y-%m-%dT%H:%M")));
        } else {
            parts.push(format!("due:{}", wire::format_timestamp(&due)));
        }
    }
    if record.progress > 0 {
        parts.push(format!("prog:{}", record.progress));
    }
    if let Some(description) = record.description.as_deref().filter(|d| !d.trim().is_empty()) {
        parts.push("--".to_string());
        parts.push(description.to_string());
    }
    parts.join(" ")
}

pub fn parse_date_spec(spec: &str) -> Result<DateTime<Utc>, CaptureError> {
    parse_date_spec_at(spec, Local::now())
}

/// Resolve a date specification relative to `now`.
///
/// Accepts `now`, `today`, `tomorrow`, `+Nd`/`+Nw`/`+Nm`, weekday names,
/// RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM` and `HH:MM`. Day-only forms
/// resolve to 09:00 local time.
pub fn parse_date_spec_at(spec: &str, now: DateTime<Local>) -> Result<DateTime<Utc>, CaptureError> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::InvalidDate(
            "Date specification cannot be empty".into(),
        ));
    }

    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "now" => return Ok(now.with_timezone(&Utc)),
        "today" => return Ok(morning_of(now.date_naive())),
        "tomorrow" => return Ok(morning_of(now.date_naive() + Duration::days(1))),
        _ => {}
    }

    if let Some(offset) = lower.strip_prefix('+') {
        return parse_relative_spec(offset, now);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        let mut days_ahead = (weekday.num_days_from_monday() as i64
            - now.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        return Ok(morning_of(now.date_naive() + Duration::days(days_ahead)));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(morning_of(date));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M") {
        return Ok(wire::local_to_utc(naive));
    }

    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        return Ok(wire::local_to_utc(now.date_naive().and_time(time)));
    }

    Err(CaptureError::InvalidDate(format!(
        "Unrecognized date specification '{spec}'. Try YYYY-MM-DD, today, tomorrow, +3d, mon"
    )))
}

fn morning_of(date: NaiveDate) -> DateTime<Utc> {
    wire::local_to_utc(date.and_time(NaiveTime::MIN) + Duration::hours(9))
}

fn parse_relative_spec(offset: &str, now: DateTime<Local>) -> Result<DateTime<Utc>, CaptureError> {
    let invalid = || CaptureError::InvalidDate(format!("Invalid relative date '+{offset}'"));
    if offset.len() < 2 || !offset.is_ascii() {
        return Err(invalid());
    }

    let (number, unit) = offset.split_at(offset.len() - 1);
    let value: u32 = number.parse().map_err(|_| invalid())?;
    let target = match unit {
        "d" => now.checked_add_signed(Duration::days(value.into())),
        "w" => now.checked_add_signed(Duration::weeks(value.into())),
        "m" => now.checked_add_months(Months::new(value)),
        other => {
            return Err(CaptureError::InvalidDate(format!(
                "Unsupported relative unit '{other}'. Use d, w, or m."
            )))
        }
    };
    target.map(|dt| dt.with_timezone(&Utc)).ok_or_else(invalid)
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
