use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::wire;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Study,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Study,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Shopping => "shopping",
            Category::Study => "study",
            Category::Other => "other",
        }
    }

    /// Lenient decoding used for server payloads: anything unknown is `Other`.
    pub fn from_wire(value: Option<&str>) -> Self {
        value
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Category::Work),
            "personal" => Ok(Category::Personal),
            "shopping" => Ok(Category::Shopping),
            "study" => Ok(Category::Study),
            "other" => Ok(Category::Other),
            other => Err(anyhow!(
                "Unknown category '{}': expected work|personal|shopping|study|other",
                other
            )),
        }
    }
}

impl ValueEnum for Category {
    fn value_variants<'a>() -> &'a [Self] {
        &Category::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Category::from_wire(raw.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Sort rank: high first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            None => Priority::Low,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(priority = raw, "unrecognized priority in payload, using low");
                Priority::Low
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(anyhow!(
                "Unknown priority '{}': expected low|medium|high",
                other
            )),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        &Priority::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Priority::from_wire(raw.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [
        StatusFilter::All,
        StatusFilter::Active,
        StatusFilter::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" | "open" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            other => Err(anyhow!(
                "Unknown status '{}': expected all|active|completed",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    #[value(aliases = ["dueDate", "duedate", "due_date"])]
    Due,
    Priority,
    Created,
    /// Server order, untouched.
    Manual,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Due,
        SortKey::Priority,
        SortKey::Created,
        SortKey::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Due => "due",
            SortKey::Priority => "priority",
            SortKey::Created => "created",
            SortKey::Manual => "manual",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Due => "Due date",
            SortKey::Priority => "Priority",
            SortKey::Created => "Newest first",
            SortKey::Manual => "Manual order",
        }
    }

    /// Stored preferences may carry keys this build does not know; those keep
    /// server order instead of failing.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(SortKey::Manual)
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "due" | "duedate" | "due_date" | "due-date" => Ok(SortKey::Due),
            "priority" => Ok(SortKey::Priority),
            "created" | "created_at" | "created-at" => Ok(SortKey::Created),
            "manual" | "none" => Ok(SortKey::Manual),
            other => Err(anyhow!(
                "Unknown sort key '{}': expected due|priority|created|manual",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(deserialize_with = "wire::identifier")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "wire::optional_text")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "wire::progress")]
    pub progress: u8,
    #[serde(default)]
    pub completed: bool,
    #[serde(
        rename = "due_date",
        default,
        deserialize_with = "wire::optional_timestamp",
        serialize_with = "wire::serialize_optional_timestamp"
    )]
    pub due: Option<DateTime<Utc>>,
    #[serde(
        rename = "created_at",
        default = "wire::epoch",
        deserialize_with = "wire::timestamp"
    )]
    pub created: DateTime<Utc>,
    #[serde(
        rename = "updated_at",
        default,
        deserialize_with = "wire::optional_timestamp",
        serialize_with = "wire::serialize_optional_timestamp"
    )]
    pub updated: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub status: StatusFilter,
    pub category: Option<Category>,
    pub search: String,
    pub sort: SortKey,
}

/// Partial update merged into a [`FilterConfig`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub status: Option<StatusFilter>,
    pub category: Option<Option<Category>>,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

impl FilterPatch {
    pub fn status(status: StatusFilter) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn search<T: Into<String>>(text: T) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn sort(sort: SortKey) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }

    pub fn category(category: Option<Category>) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }
}

/// Payload for creating a task. The server assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub progress: u8,
    #[serde(
        rename = "due_date",
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire::serialize_optional_timestamp"
    )]
    pub due: Option<DateTime<Utc>>,
}

/// Partial update sent to `PUT /todos/{id}`. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// `Some(None)` clears the due date.
    #[serde(
        rename = "due_date",
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire::serialize_due_update"
    )]
    pub due: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// The single payload used for every completion toggle: completing forces
    /// progress to 100, reopening keeps whatever progress the task had.
    pub fn completion(record: &TaskRecord, completed: bool) -> Self {
        let progress = if completed { 100 } else { record.progress };
        Self {
            completed: Some(completed),
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// Full edit of the user-editable fields, as submitted by the edit form.
    pub fn from_draft(draft: TaskDraft) -> Self {
        Self {
            title: Some(draft.title),
            description: Some(draft.description.unwrap_or_default()),
            category: Some(draft.category),
            priority: Some(draft.priority),
            progress: Some(draft.progress),
            completed: None,
            due: Some(draft.due),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    #[serde(default)]
    pub high: usize,
    #[serde(default)]
    pub medium: usize,
    #[serde(default)]
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    #[serde(default)]
    pub work: usize,
    #[serde(default)]
    pub personal: usize,
    #[serde(default)]
    pub shopping: usize,
    #[serde(default)]
    pub study: usize,
    #[serde(default)]
    pub other: usize,
}

impl CategoryBreakdown {
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Work => self.work,
            Category::Personal => self.personal,
            Category::Shopping => self.shopping,
            Category::Study => self.study,
            Category::Other => self.other,
        }
    }
}

/// Aggregate counters served by `GET /todos/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub active: usize,
    #[serde(default)]
    pub completed: usize,
    #[serde(default)]
    pub overdue: usize,
    #[serde(default)]
    pub completed_today: usize,
    #[serde(default)]
    pub by_priority: PriorityBreakdown,
    #[serde(default)]
    pub by_category: CategoryBreakdown,
}

impl TaskStats {
    /// Percentage of `count` against the total, 0 when there are no tasks.
    pub fn share(&self, count: usize) -> u16 {
        if self.total == 0 {
            return 0;
        }
        ((count.min(self.total) * 100) / self.total) as u16
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(
        default,
        deserialize_with = "wire::optional_timestamp",
        serialize_with = "wire::serialize_optional_timestamp"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
