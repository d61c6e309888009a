// task.rs

use crate::error::ValidationError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TaskId = i64;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Cycles low -> medium -> high -> low, used by the input form.
    pub fn next(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as the remote service returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, with = "local_time::option")]
    pub reminder_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_reminded: bool,
    #[serde(default, with = "local_time::option")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, with = "local_time::option")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Payload for `POST /tasks`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "local_time::option::serialize"
    )]
    pub reminder_time: Option<NaiveDateTime>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn reminder_time(mut self, at: NaiveDateTime) -> Self {
        self.reminder_time = Some(at);
        self
    }

    /// Trims the title, drops blank descriptions and enforces length bounds.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.title = validate_title(&self.title)?;
        self.description = normalize_description(self.description)?;
        Ok(self)
    }
}

/// Payload for `PUT /tasks/{id}`. `None` fields are left out of the request;
/// `Some(None)` on the nullable fields clears them server-side.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "local_time::nested::serialize"
    )]
    pub reminder_time: Option<Option<NaiveDateTime>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if let Some(title) = self.title.take() {
            self.title = Some(validate_title(&title)?);
        }
        if let Some(description) = self.description.take() {
            self.description = Some(normalize_description(description)?);
        }
        Ok(self)
    }
}

pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("title", "cannot be empty"));
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::new(
            "title",
            format!("must not exceed {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Result<Option<String>, ValidationError> {
    match description {
        Some(d) if d.trim().is_empty() => Ok(None),
        Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => Err(ValidationError::new(
            "description",
            format!("must not exceed {DESCRIPTION_MAX_CHARS} characters"),
        )),
        other => Ok(other),
    }
}

/// Wire format for timestamps. The service sends naive local times
/// (`2026-01-25T17:00:00`); offsets are accepted and shifted to local time.
pub mod local_time {
    use chrono::{DateTime, Local, NaiveDateTime};

    pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(naive) = raw.parse::<NaiveDateTime>() {
            return Some(naive);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }

    pub mod option {
        use super::{WIRE_FORMAT, parse};
        use chrono::NaiveDateTime;
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&v.format(WIRE_FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => parse(&s)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}"))),
            }
        }
    }

    pub mod nested {
        use chrono::NaiveDateTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            value: &Option<Option<NaiveDateTime>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(inner) => super::option::serialize(inner, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_service_payload() {
        let raw = json!({
            "id": 5,
            "user_id": "u-1",
            "title": "Call mom",
            "description": null,
            "status": "pending",
            "priority": "high",
            "due_date": "2024-03-10",
            "reminder_time": "2024-03-10T17:00:00",
            "is_reminded": false,
            "created_at": "2024-03-01T09:15:02.123456",
            "updated_at": "2024-03-01T09:15:02.123456"
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.id, 5);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 3, 10));
        assert_eq!(
            task.reminder_time,
            NaiveDate::from_ymd_opt(2024, 3, 10).and_then(|d| d.and_hms_opt(17, 0, 0))
        );
        assert!(task.created_at.is_some());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let task: Task = serde_json::from_value(json!({"id": 1, "title": "x"})).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.is_reminded);
        assert!(task.reminder_time.is_none());
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let err = TaskDraft::new("   ").validated().unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn title_length_is_counted_in_chars() {
        assert!(validate_title(&"é".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(validate_title(&"é".repeat(TITLE_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn draft_is_trimmed_and_blank_description_dropped() {
        let draft = TaskDraft::new("  Buy milk ").description("  ").validated().unwrap();
        assert_eq!(draft.title, "Buy milk");
        assert_eq!(draft.description, None);
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body, json!({"title": "Buy milk"}));
    }

    #[test]
    fn draft_serializes_reminder_in_wire_format() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 25)
            .and_then(|d| d.and_hms_opt(17, 0, 0))
            .unwrap();
        let body = serde_json::to_value(TaskDraft::new("Gym").reminder_time(at)).unwrap();
        assert_eq!(body["reminder_time"], "2026-01-25T17:00:00");
    }

    #[test]
    fn patch_only_sends_set_fields_and_explicit_nulls() {
        let patch = TaskPatch {
            due_date: Some(None),
            ..TaskPatch::status(TaskStatus::Pending)
        };
        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body, json!({"status": "pending", "due_date": null}));
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn offset_timestamps_are_shifted_to_local() {
        assert!(local_time::parse("2024-03-10T17:00:00Z").is_some());
        assert!(local_time::parse("2024-03-10 17:00").is_some());
        assert!(local_time::parse("tomorrow").is_none());
    }
}
