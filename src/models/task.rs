//! Task record and its write-side payloads.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored task record.
///
/// `id` is store-assigned and immutable; `owner_id` is set once at creation
/// from the authenticated creator and never mutated afterwards. The serde
/// names are the wire contract (`ownerId` included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub priority: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub time_hour: Option<i32>,
    #[serde(rename = "ownerId")]
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A validated task ready for insertion. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub priority: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub time_hour: Option<i32>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A validated partial update.
///
/// Outer `None` means "leave unchanged"; for the clearable fields the inner
/// `None` means "set to absent". `id`, `owner_id` and `created_at` are never
/// updatable.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub is_done: Option<bool>,
    pub priority: Option<i32>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category: Option<Option<String>>,
    pub time_hour: Option<Option<i32>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.is_done.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.category.is_none()
            && self.time_hour.is_none()
    }

    /// Produce the post-image of `task` with these changes applied.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(is_done) = self.is_done {
            task.is_done = is_done;
        }
        if let Some(priority) = self.priority {
            task.priority = Some(priority);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(ref category) = self.category {
            task.category = category.clone();
        }
        if let Some(time_hour) = self.time_hour {
            task.time_hour = time_hour;
        }
    }
}

/// Parse a due date from client text, normalized to a UTC instant.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}
