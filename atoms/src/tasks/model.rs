use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Closed status set driving the task workflow. Any value outside this
/// enumeration is rejected at the wire and at the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    New,
    Pending,
    Accepted,
    Rejected,
    InProgress,
    ReadyForTest,
    QaFailed,
    Completed,
    Failed,
    Deleted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::Pending => "pending",
            TaskStatus::Accepted => "accepted",
            TaskStatus::Rejected => "rejected",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::ReadyForTest => "ready-for-test",
            TaskStatus::QaFailed => "qa-failed",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "new" => Some(TaskStatus::New),
            "pending" => Some(TaskStatus::Pending),
            "accepted" => Some(TaskStatus::Accepted),
            "rejected" => Some(TaskStatus::Rejected),
            "in-progress" => Some(TaskStatus::InProgress),
            "ready-for-test" => Some(TaskStatus::ReadyForTest),
            "qa-failed" => Some(TaskStatus::QaFailed),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "deleted" => Some(TaskStatus::Deleted),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::New
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Task domain model. Wire field names are camelCase to match the
/// dashboard client.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,

    /// Employee the task is assigned to; None = unassigned
    pub assigned_to: Option<String>,
    /// Set once at creation, never reassigned
    pub created_by: String,
    /// Actor who soft-deleted the task; cleared again on restore
    pub deleted_by: Option<String>,

    pub category: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    /// Present only after a failure report (`failed` / `qa-failed`)
    pub failed_reason: Option<String>,

    pub created_at: String,
    pub updated_at: String,

    /// Bumped on every write; conditional puts reject stale revisions
    #[serde(default)]
    pub revision: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_to: Option<String>,
    pub category: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
}

impl CreateTaskPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::Validation("Description is required".to_string()));
        }
        Ok(())
    }
}

/// Structured partial update: every mutable field is named and typed, and
/// unknown keys are a parse error rather than a silent no-op.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTaskPayload {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: Option<String>,
    pub failed_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: TaskStatus,
    pub failed_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_names() {
        for (status, wire) in [
            (TaskStatus::New, "\"new\""),
            (TaskStatus::InProgress, "\"in-progress\""),
            (TaskStatus::ReadyForTest, "\"ready-for-test\""),
            (TaskStatus::QaFailed, "\"qa-failed\""),
            (TaskStatus::Deleted, "\"deleted\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
            assert_eq!(serde_json::from_str::<TaskStatus>(wire).unwrap(), status);
        }
    }

    #[test]
    fn out_of_enumeration_status_is_rejected() {
        assert!(serde_json::from_str::<TaskStatus>("\"archived\"").is_err());
        assert_eq!(TaskStatus::parse("archived"), None);
    }

    #[test]
    fn every_status_parses_back_from_as_str() {
        for status in [
            TaskStatus::New,
            TaskStatus::Pending,
            TaskStatus::Accepted,
            TaskStatus::Rejected,
            TaskStatus::InProgress,
            TaskStatus::ReadyForTest,
            TaskStatus::QaFailed,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Deleted,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn create_payload_requires_title_and_description() {
        let payload: CreateTaskPayload =
            serde_json::from_str(r#"{"description":"write the docs"}"#).unwrap();
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));

        let payload: CreateTaskPayload =
            serde_json::from_str(r#"{"title":"   ","description":"x"}"#).unwrap();
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));

        let payload: CreateTaskPayload =
            serde_json::from_str(r#"{"title":"Docs","description":"write them"}"#).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn update_payload_rejects_unknown_keys() {
        let err = serde_json::from_str::<UpdateTaskPayload>(r#"{"owner":"mallory"}"#);
        assert!(err.is_err());

        let ok: UpdateTaskPayload =
            serde_json::from_str(r#"{"priority":"High","status":"accepted"}"#).unwrap();
        assert_eq!(ok.priority, Some(Priority::High));
        assert_eq!(ok.status, Some(TaskStatus::Accepted));
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task {
            id: "t1".into(),
            title: "Design review".into(),
            description: "go through the doc".into(),
            status: TaskStatus::New,
            assigned_to: Some("u2".into()),
            created_by: "u1".into(),
            deleted_by: None,
            category: None,
            due_date: Some("2025-06-01".into()),
            priority: Some(Priority::Medium),
            failed_reason: None,
            created_at: "2025-01-01T00:00:00+00:00".into(),
            updated_at: "2025-01-01T00:00:00+00:00".into(),
            revision: 0,
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"assignedTo\":\"u2\""));
        assert!(json.contains("\"createdBy\":\"u1\""));
        assert!(json.contains("\"dueDate\":\"2025-06-01\""));
        assert!(json.contains("\"status\":\"new\""));
    }
}
