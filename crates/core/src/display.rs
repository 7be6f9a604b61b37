//! Derived, presentation-neutral attributes for task records.

use chrono::{DateTime, Utc};

use crate::model::{Category, Priority, TaskRecord};

pub const OVERDUE_MARKER: &str = "overdue";

/// Colour family a renderer should use for a badge or bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Blue,
    Purple,
    Pink,
    Indigo,
    Gray,
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeInfo {
    pub label: &'static str,
    pub tone: Tone,
}

pub fn category_info(category: Option<Category>) -> BadgeInfo {
    match category.unwrap_or_default() {
        Category::Work => BadgeInfo {
            label: "Work",
            tone: Tone::Blue,
        },
        Category::Personal => BadgeInfo {
            label: "Personal",
            tone: Tone::Purple,
        },
        Category::Shopping => BadgeInfo {
            label: "Shopping",
            tone: Tone::Pink,
        },
        Category::Study => BadgeInfo {
            label: "Study",
            tone: Tone::Indigo,
        },
        Category::Other => BadgeInfo {
            label: "Other",
            tone: Tone::Gray,
        },
    }
}

pub fn priority_info(priority: Option<Priority>) -> BadgeInfo {
    match priority.unwrap_or_default() {
        Priority::Low => BadgeInfo {
            label: "Low",
            tone: Tone::Green,
        },
        Priority::Medium => BadgeInfo {
            label: "Medium",
            tone: Tone::Yellow,
        },
        Priority::High => BadgeInfo {
            label: "High",
            tone: Tone::Red,
        },
    }
}

pub fn progress_tone(progress: u8, completed: bool) -> Tone {
    match progress {
        _ if completed => Tone::Green,
        100..=u8::MAX => Tone::Green,
        50..=99 => Tone::Blue,
        25..=49 => Tone::Yellow,
        _ => Tone::Red,
    }
}

/// Human readable time left until `due`, relative to `now`.
///
/// Absent due dates yield an empty string and past ones the
/// [`OVERDUE_MARKER`]. Otherwise whole days and remaining whole hours, with
/// the day component dropped when it is zero.
pub fn time_remaining(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(due) = due else {
        return String::new();
    };

    let diff = due.signed_duration_since(now);
    if diff < chrono::Duration::zero() {
        return OVERDUE_MARKER.to_string();
    }

    let days = diff.num_days();
    let hours = diff.num_hours() - days * 24;
    if days > 0 {
        format!("{days} days {hours} hours remaining")
    } else {
        format!("{hours} hours remaining")
    }
}

impl TaskRecord {
    pub fn category_info(&self) -> BadgeInfo {
        category_info(Some(self.category))
    }

    pub fn priority_info(&self) -> BadgeInfo {
        priority_info(Some(self.priority))
    }

    pub fn progress_tone(&self) -> Tone {
        progress_tone(self.progress, self.completed)
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> String {
        time_remaining(self.due, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_category_and_priority_use_defaults() {
        assert_eq!(category_info(None).label, "Other");
        assert_eq!(category_info(None).tone, Tone::Gray);
        assert_eq!(priority_info(None).label, "Low");
        assert_eq!(priority_info(Some(Priority::High)).tone, Tone::Red);
    }

    #[rstest]
    #[case(Duration::days(2) + Duration::hours(5) + Duration::minutes(30), "2 days 5 hours remaining")]
    #[case(Duration::hours(7) + Duration::minutes(59), "7 hours remaining")]
    #[case(Duration::zero(), "0 hours remaining")]
    #[case(Duration::days(1), "1 days 0 hours remaining")]
    #[case(Duration::minutes(-1), "overdue")]
    fn time_remaining_renders_days_and_hours(#[case] offset: Duration, #[case] expected: &str) {
        assert_eq!(time_remaining(Some(now() + offset), now()), expected);
    }

    #[test]
    fn time_remaining_is_empty_without_due_date() {
        assert_eq!(time_remaining(None, now()), "");
    }

    #[rstest]
    #[case(0, false, Tone::Red)]
    #[case(30, false, Tone::Yellow)]
    #[case(60, false, Tone::Blue)]
    #[case(100, false, Tone::Green)]
    #[case(10, true, Tone::Green)]
    fn progress_tone_thresholds(#[case] progress: u8, #[case] completed: bool, #[case] tone: Tone) {
        assert_eq!(progress_tone(progress, completed), tone);
    }
}
