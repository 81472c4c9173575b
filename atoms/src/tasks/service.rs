use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::model::{CreateTaskPayload, Priority, Task, TaskStatus, UpdateTaskPayload};
use super::workflow;
use crate::error::ApiError;
use crate::users::model::Actor;

/// All tasks share one partition; items are keyed TASK#{id}
const TASK_PK: &str = "TASK";

fn task_sk(task_id: &str) -> String {
    format!("TASK#{}", task_id)
}

fn get_s(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.to_string())
}

pub(crate) fn task_from_item(item: &HashMap<String, AttributeValue>) -> Result<Task, ApiError> {
    let sk = get_s(item, "SK").unwrap_or_default();
    let id = sk.strip_prefix("TASK#").unwrap_or_default().to_string();

    // A status outside the enumeration never legally reaches the store;
    // finding one is a persistence fault, not a client error.
    let status_raw = get_s(item, "status").unwrap_or_default();
    let status = TaskStatus::parse(&status_raw).ok_or_else(|| {
        ApiError::Persistence(format!("Invalid task status '{}' in store", status_raw))
    })?;

    Ok(Task {
        id,
        title: get_s(item, "title").unwrap_or_default(),
        description: get_s(item, "description").unwrap_or_default(),
        status,
        assigned_to: get_s(item, "assigned_to"),
        created_by: get_s(item, "created_by").unwrap_or_default(),
        deleted_by: get_s(item, "deleted_by"),
        category: get_s(item, "category"),
        due_date: get_s(item, "due_date"),
        priority: get_s(item, "priority").and_then(|p| Priority::parse(&p)),
        failed_reason: get_s(item, "failed_reason"),
        created_at: get_s(item, "created_at").unwrap_or_default(),
        updated_at: get_s(item, "updated_at").unwrap_or_default(),
        revision: item
            .get("revision")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0),
    })
}

pub(crate) fn task_item(task: &Task) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("PK".to_string(), AttributeValue::S(TASK_PK.to_string()));
    item.insert("SK".to_string(), AttributeValue::S(task_sk(&task.id)));
    item.insert("title".to_string(), AttributeValue::S(task.title.clone()));
    item.insert(
        "description".to_string(),
        AttributeValue::S(task.description.clone()),
    );
    item.insert(
        "status".to_string(),
        AttributeValue::S(task.status.as_str().to_string()),
    );
    item.insert(
        "created_by".to_string(),
        AttributeValue::S(task.created_by.clone()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(task.created_at.clone()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(task.updated_at.clone()),
    );
    item.insert(
        "revision".to_string(),
        AttributeValue::N(task.revision.to_string()),
    );

    if let Some(assigned_to) = &task.assigned_to {
        item.insert(
            "assigned_to".to_string(),
            AttributeValue::S(assigned_to.clone()),
        );
    }
    if let Some(deleted_by) = &task.deleted_by {
        item.insert(
            "deleted_by".to_string(),
            AttributeValue::S(deleted_by.clone()),
        );
    }
    if let Some(category) = &task.category {
        item.insert("category".to_string(), AttributeValue::S(category.clone()));
    }
    if let Some(due_date) = &task.due_date {
        item.insert("due_date".to_string(), AttributeValue::S(due_date.clone()));
    }
    if let Some(priority) = &task.priority {
        item.insert(
            "priority".to_string(),
            AttributeValue::S(priority.as_str().to_string()),
        );
    }
    if let Some(failed_reason) = &task.failed_reason {
        item.insert(
            "failed_reason".to_string(),
            AttributeValue::S(failed_reason.clone()),
        );
    }

    item
}

/// Load every task (admin listing; includes soft-deleted ones)
pub async fn load_all_tasks(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<Task>, ApiError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(TASK_PK.to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("TASK#".to_string()))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB query error: {}", e)))?;

    let mut tasks = Vec::new();
    for item in result.items() {
        tasks.push(task_from_item(item)?);
    }
    Ok(tasks)
}

/// Default listing for an employee: tasks assigned to them, with
/// soft-deleted tasks filtered out.
pub async fn load_tasks_for_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Vec<Task>, ApiError> {
    let mut tasks = load_all_tasks(client, table_name).await?;
    tasks.retain(|t| {
        t.assigned_to.as_deref() == Some(user_id) && t.status != TaskStatus::Deleted
    });
    Ok(tasks)
}

pub async fn get_task(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
) -> Result<Task, ApiError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(TASK_PK.to_string()))
        .key("SK", AttributeValue::S(task_sk(task_id)))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB get_item error: {}", e)))?;

    match result.item() {
        Some(item) => task_from_item(item),
        None => Err(ApiError::NotFound("Task not found".to_string())),
    }
}

/// Create a new task; status always starts at `new`
pub async fn create_task(
    client: &DynamoClient,
    table_name: &str,
    payload: CreateTaskPayload,
    created_by: &str,
) -> Result<Task, ApiError> {
    payload.validate()?;

    let now = chrono::Utc::now().to_rfc3339();
    let task = Task {
        id: uuid::Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        status: TaskStatus::New,
        assigned_to: payload.assigned_to,
        created_by: created_by.to_string(),
        deleted_by: None,
        category: payload.category,
        due_date: payload.due_date,
        priority: payload.priority,
        failed_reason: None,
        created_at: now.clone(),
        updated_at: now,
        revision: 0,
    };

    client
        .put_item()
        .table_name(table_name)
        .set_item(Some(task_item(&task)))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB put_item error: {}", e)))?;

    Ok(task)
}

/// Replace a task, guarded on the revision read at the start of the
/// operation. A lost race surfaces as Conflict instead of silently
/// overwriting the other writer.
async fn replace_task(
    client: &DynamoClient,
    table_name: &str,
    task: &Task,
    expected_revision: u64,
) -> Result<(), ApiError> {
    client
        .put_item()
        .table_name(table_name)
        .set_item(Some(task_item(task)))
        .condition_expression("revision = :expected")
        .expression_attribute_values(
            ":expected",
            AttributeValue::N(expected_revision.to_string()),
        )
        .send()
        .await
        .map_err(|e| {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                ApiError::Conflict("Task was modified concurrently".to_string())
            } else {
                ApiError::Persistence(format!("DynamoDB put_item error: {}", service_err))
            }
        })?;
    Ok(())
}

/// Apply a status transition through the workflow engine and persist it
pub async fn set_task_status(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    target: TaskStatus,
    actor: &Actor,
    failed_reason: Option<&str>,
) -> Result<Task, ApiError> {
    let current = get_task(client, table_name, task_id).await?;
    let mut updated = workflow::apply_transition(&current, target, actor, failed_reason)?;
    updated.revision = current.revision + 1;
    replace_task(client, table_name, &updated, current.revision).await?;
    Ok(updated)
}

/// Structured partial update. A status in the payload rides through the
/// workflow engine so side effects match `set_task_status` exactly,
/// including the soft-delete validation bypass.
pub async fn update_task_fields(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    payload: UpdateTaskPayload,
    actor: &Actor,
) -> Result<Task, ApiError> {
    let current = get_task(client, table_name, task_id).await?;

    let mut updated = match payload.status {
        Some(target) => {
            workflow::apply_transition(&current, target, actor, payload.failed_reason.as_deref())?
        }
        None => current.clone(),
    };

    if let Some(title) = payload.title {
        updated.title = title;
    }
    if let Some(description) = payload.description {
        updated.description = description;
    }
    if let Some(category) = payload.category {
        updated.category = Some(category);
    }
    if let Some(due_date) = payload.due_date {
        updated.due_date = Some(due_date);
    }
    if let Some(priority) = payload.priority {
        updated.priority = Some(priority);
    }
    if let Some(assigned_to) = payload.assigned_to {
        updated.assigned_to = Some(assigned_to);
    }
    if payload.status.is_none() {
        if let Some(failed_reason) = payload.failed_reason {
            updated.failed_reason = Some(failed_reason);
        }
    }

    // Field edits may not blank out required fields, unless the record
    // is being soft-deleted in the same request
    if updated.status != TaskStatus::Deleted {
        workflow::validate_required(&updated)?;
    }

    updated.updated_at = chrono::Utc::now().to_rfc3339();
    updated.revision = current.revision + 1;
    replace_task(client, table_name, &updated, current.revision).await?;
    Ok(updated)
}

/// Permanently erase a task. Admin-only at the boundary; irreversible,
/// unlike the soft-delete transition.
pub async fn delete_task(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
) -> Result<(), ApiError> {
    get_task(client, table_name, task_id).await?;

    client
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(TASK_PK.to_string()))
        .key("SK", AttributeValue::S(task_sk(task_id)))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB delete_item error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: "11111111-2222-3333-4444-555555555555".into(),
            title: "Ship the release".into(),
            description: "cut and tag".into(),
            status: TaskStatus::ReadyForTest,
            assigned_to: Some("emp-1".into()),
            created_by: "admin-1".into(),
            deleted_by: None,
            category: Some("release".into()),
            due_date: Some("2025-07-01".into()),
            priority: Some(Priority::High),
            failed_reason: None,
            created_at: "2025-01-01T00:00:00+00:00".into(),
            updated_at: "2025-02-01T00:00:00+00:00".into(),
            revision: 7,
        }
    }

    #[test]
    fn item_round_trips() {
        let task = sample_task();
        let restored = task_from_item(&task_item(&task)).unwrap();
        assert_eq!(restored.id, task.id);
        assert_eq!(restored.status, TaskStatus::ReadyForTest);
        assert_eq!(restored.assigned_to.as_deref(), Some("emp-1"));
        assert_eq!(restored.priority, Some(Priority::High));
        assert_eq!(restored.revision, 7);
        assert_eq!(restored.deleted_by, None);
    }

    #[test]
    fn absent_optionals_stay_absent() {
        let mut task = sample_task();
        task.assigned_to = None;
        task.category = None;
        task.priority = None;

        let item = task_item(&task);
        assert!(!item.contains_key("assigned_to"));
        assert!(!item.contains_key("category"));
        assert!(!item.contains_key("priority"));

        let restored = task_from_item(&item).unwrap();
        assert_eq!(restored.assigned_to, None);
        assert_eq!(restored.priority, None);
    }

    #[test]
    fn corrupt_status_is_a_persistence_error() {
        let mut item = task_item(&sample_task());
        item.insert(
            "status".to_string(),
            AttributeValue::S("archived".to_string()),
        );
        let err = task_from_item(&item).unwrap_err();
        assert!(matches!(err, ApiError::Persistence(_)));
    }
}
