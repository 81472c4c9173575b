use super::model::{Task, TaskStatus};
use crate::error::ApiError;
use crate::users::model::{Actor, Role};

/// Single predicate for the sanctioned transition table, shared by every
/// entry point so the server and the dashboard agree on which moves are
/// legal. Self-transitions are always allowed: repeating a request is
/// idempotent and side effects overwrite rather than accumulate.
///
/// Soft delete and restore are admin-only.
pub fn is_transition_allowed(from: TaskStatus, to: TaskStatus, role: Role) -> bool {
    use TaskStatus::*;

    if from == to {
        return to != Deleted || role == Role::Admin;
    }

    if to == Deleted {
        return role == Role::Admin;
    }

    match (from, to) {
        (New | Pending, Accepted | Rejected | InProgress) => true,
        (Accepted, InProgress | Completed | ReadyForTest | Failed) => true,
        (InProgress, Completed | ReadyForTest | Failed) => true,
        (ReadyForTest, Completed | QaFailed | Failed) => true,
        (QaFailed, New | InProgress) => true,
        (Failed, New) => true,
        (Deleted, New) => role == Role::Admin,
        _ => false,
    }
}

pub(crate) fn validate_required(task: &Task) -> Result<(), ApiError> {
    if task.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    if task.description.trim().is_empty() {
        return Err(ApiError::Validation("Description is required".to_string()));
    }
    Ok(())
}

/// Apply a status transition to a task, returning the updated record.
///
/// Side effects by target:
/// - `deleted`: stamps `deleted_by` with the acting identity and skips
///   required-field validation, so a half-filled task can still be
///   soft-deleted. The only transition with that relaxation.
/// - `new`: clears `deleted_by` (restore path).
/// - `failed` / `qa-failed`: requires a non-blank failure reason, stored
///   verbatim. A blank reason fails before any mutation.
///
/// The caller persists the result; nothing is written here.
pub fn apply_transition(
    task: &Task,
    target: TaskStatus,
    actor: &Actor,
    failed_reason: Option<&str>,
) -> Result<Task, ApiError> {
    if !is_transition_allowed(task.status, target, actor.role) {
        // Distinguish "wrong role" from "not a sanctioned move"
        if actor.role != Role::Admin && is_transition_allowed(task.status, target, Role::Admin) {
            return Err(ApiError::Authorization(format!(
                "Only an admin may move a task to '{}'",
                target
            )));
        }
        return Err(ApiError::Validation(format!(
            "Cannot move task from '{}' to '{}'",
            task.status, target
        )));
    }

    let mut updated = task.clone();

    if matches!(target, TaskStatus::Failed | TaskStatus::QaFailed) {
        match failed_reason {
            Some(reason) if !reason.trim().is_empty() => {
                updated.failed_reason = Some(reason.to_string());
            }
            _ => {
                return Err(ApiError::Validation(
                    "A failure reason is required".to_string(),
                ));
            }
        }
    }

    match target {
        TaskStatus::Deleted => updated.deleted_by = Some(actor.id.clone()),
        TaskStatus::New => updated.deleted_by = None,
        _ => {}
    }

    // Soft delete is the one transition that bypasses field validation
    if target != TaskStatus::Deleted {
        validate_required(&updated)?;
    }

    updated.status = target;
    updated.updated_at = chrono::Utc::now().to_rfc3339();

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::Priority;

    fn admin() -> Actor {
        Actor {
            id: "admin-1".into(),
            role: Role::Admin,
        }
    }

    fn employee() -> Actor {
        Actor {
            id: "emp-1".into(),
            role: Role::Employee,
        }
    }

    fn task(status: TaskStatus) -> Task {
        Task {
            id: "t1".into(),
            title: "Design review".into(),
            description: "go through the doc".into(),
            status,
            assigned_to: Some("emp-1".into()),
            created_by: "admin-1".into(),
            deleted_by: None,
            category: None,
            due_date: None,
            priority: Some(Priority::Medium),
            failed_reason: None,
            created_at: "2025-01-01T00:00:00+00:00".into(),
            updated_at: "2025-01-01T00:00:00+00:00".into(),
            revision: 3,
        }
    }

    #[test]
    fn employee_walks_the_happy_path() {
        let t = task(TaskStatus::New);
        let t = apply_transition(&t, TaskStatus::Accepted, &employee(), None).unwrap();
        let t = apply_transition(&t, TaskStatus::InProgress, &employee(), None).unwrap();
        let t = apply_transition(&t, TaskStatus::ReadyForTest, &employee(), None).unwrap();
        let t = apply_transition(&t, TaskStatus::Completed, &employee(), None).unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
        assert!(t.deleted_by.is_none());
    }

    #[test]
    fn unsanctioned_move_is_a_validation_error() {
        let t = task(TaskStatus::Completed);
        let err = apply_transition(&t, TaskStatus::InProgress, &admin(), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let t = task(TaskStatus::Rejected);
        let err = apply_transition(&t, TaskStatus::Accepted, &employee(), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn failure_report_requires_a_reason() {
        let t = task(TaskStatus::InProgress);

        let err = apply_transition(&t, TaskStatus::Failed, &employee(), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = apply_transition(&t, TaskStatus::Failed, &employee(), Some("   ")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let done =
            apply_transition(&t, TaskStatus::Failed, &employee(), Some("blocked on API")).unwrap();
        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.failed_reason.as_deref(), Some("blocked on API"));
    }

    #[test]
    fn qa_failure_also_requires_a_reason() {
        let t = task(TaskStatus::ReadyForTest);
        let err = apply_transition(&t, TaskStatus::QaFailed, &employee(), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let failed =
            apply_transition(&t, TaskStatus::QaFailed, &employee(), Some("flaky login")).unwrap();
        assert_eq!(failed.failed_reason.as_deref(), Some("flaky login"));

        // qa-failed tasks can be picked up again
        let retried = apply_transition(&failed, TaskStatus::InProgress, &employee(), None).unwrap();
        assert_eq!(retried.status, TaskStatus::InProgress);
    }

    #[test]
    fn soft_delete_stamps_deleter_and_bypasses_validation() {
        let mut t = task(TaskStatus::InProgress);
        t.description = String::new(); // incomplete record

        let deleted = apply_transition(&t, TaskStatus::Deleted, &admin(), None).unwrap();
        assert_eq!(deleted.status, TaskStatus::Deleted);
        assert_eq!(deleted.deleted_by.as_deref(), Some("admin-1"));
    }

    #[test]
    fn non_bypassed_transitions_still_validate_fields() {
        let mut t = task(TaskStatus::New);
        t.title = String::new();
        let err = apply_transition(&t, TaskStatus::Accepted, &employee(), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn soft_delete_is_admin_only() {
        let t = task(TaskStatus::InProgress);
        let err = apply_transition(&t, TaskStatus::Deleted, &employee(), None).unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));
    }

    #[test]
    fn restore_clears_deleted_by_and_is_admin_only() {
        let t = task(TaskStatus::InProgress);
        let deleted = apply_transition(&t, TaskStatus::Deleted, &admin(), None).unwrap();
        assert!(deleted.deleted_by.is_some());

        let err = apply_transition(&deleted, TaskStatus::New, &employee(), None).unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));

        let restored = apply_transition(&deleted, TaskStatus::New, &admin(), None).unwrap();
        assert_eq!(restored.status, TaskStatus::New);
        assert!(restored.deleted_by.is_none());
    }

    #[test]
    fn repeated_soft_delete_overwrites_not_appends() {
        let t = task(TaskStatus::InProgress);
        let first = apply_transition(&t, TaskStatus::Deleted, &admin(), None).unwrap();

        let other_admin = Actor {
            id: "admin-2".into(),
            role: Role::Admin,
        };
        let second = apply_transition(&first, TaskStatus::Deleted, &other_admin, None).unwrap();
        assert_eq!(second.status, TaskStatus::Deleted);
        assert_eq!(second.deleted_by.as_deref(), Some("admin-2"));
    }

    #[test]
    fn self_transition_is_idempotent() {
        let t = task(TaskStatus::InProgress);
        let again = apply_transition(&t, TaskStatus::InProgress, &employee(), None).unwrap();
        assert_eq!(again.status, TaskStatus::InProgress);
        assert_eq!(again.failed_reason, None);
    }

    #[test]
    fn reopening_a_failed_task_goes_back_to_new() {
        let t = task(TaskStatus::InProgress);
        let failed =
            apply_transition(&t, TaskStatus::Failed, &employee(), Some("blocked")).unwrap();
        let reopened = apply_transition(&failed, TaskStatus::New, &employee(), None).unwrap();
        assert_eq!(reopened.status, TaskStatus::New);
        // the last failure report stays on the record until the next one
        assert_eq!(reopened.failed_reason.as_deref(), Some("blocked"));
    }

    #[test]
    fn rejected_tasks_only_leave_via_soft_delete() {
        for target in [
            TaskStatus::Accepted,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::New,
        ] {
            assert!(!is_transition_allowed(TaskStatus::Rejected, target, Role::Admin));
        }
        assert!(is_transition_allowed(
            TaskStatus::Rejected,
            TaskStatus::Deleted,
            Role::Admin
        ));
    }

    #[test]
    fn reason_is_not_stamped_when_the_transition_is_illegal() {
        let t = task(TaskStatus::Completed);
        let err =
            apply_transition(&t, TaskStatus::QaFailed, &employee(), Some("too late")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
