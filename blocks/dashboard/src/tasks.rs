use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use taskdeck_atoms::{tasks, users};
use taskdeck_shared::types::{Actor, ApiError, Role};

use crate::json_response;
use crate::types::{index_users, resolve_task, resolve_tasks};

/// List every task with resolved actor references (admin dashboard)
pub async fn list_all_tasks(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    // Tasks and the user roster load in parallel; the join happens here
    let (tasks_result, users_result) = tokio::join!(
        tasks::service::load_all_tasks(client, table_name),
        users::service::load_all_users(client, table_name)
    );

    let mut task_rows = match tasks_result {
        Ok(rows) => rows,
        Err(e) => return e.to_response(),
    };
    let user_rows = match users_result {
        Ok(rows) => rows,
        Err(e) => return e.to_response(),
    };

    // Newest first
    task_rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let data = resolve_tasks(task_rows, &user_rows);
    json_response(
        StatusCode::OK,
        serde_json::json!({"success": true, "data": data}),
    )
}

/// List the tasks assigned to one user. Employees may only ask for their
/// own list; admins may inspect anyone's.
pub async fn list_user_tasks(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    actor: &Actor,
) -> Result<Response<Body>, Error> {
    if actor.role != Role::Admin && actor.id != user_id {
        return ApiError::Authorization("You may only list your own tasks".to_string())
            .to_response();
    }

    let (tasks_result, users_result) = tokio::join!(
        tasks::service::load_tasks_for_user(client, table_name, user_id),
        users::service::load_all_users(client, table_name)
    );

    let mut task_rows = match tasks_result {
        Ok(rows) => rows,
        Err(e) => return e.to_response(),
    };
    let user_rows = match users_result {
        Ok(rows) => rows,
        Err(e) => return e.to_response(),
    };

    task_rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let data = resolve_tasks(task_rows, &user_rows);
    json_response(
        StatusCode::OK,
        serde_json::json!({"success": true, "data": data}),
    )
}

/// Create a new task (admin only, enforced at the router)
pub async fn create_task(
    client: &DynamoClient,
    table_name: &str,
    actor: &Actor,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: tasks::model::CreateTaskPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return ApiError::Validation(format!("Invalid request body: {}", e)).to_response()
        }
    };

    let task = match tasks::service::create_task(client, table_name, payload, &actor.id).await {
        Ok(task) => task,
        Err(e) => return e.to_response(),
    };

    tracing::info!("Task {} created by {}", task.id, actor.id);
    respond_with_resolved(client, table_name, task, StatusCode::CREATED).await
}

/// PATCH /api/tasks/{id}/status - drive the task through the workflow
pub async fn update_task_status(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    actor: &Actor,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: tasks::model::UpdateStatusPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return ApiError::Validation(format!("Invalid request body: {}", e)).to_response()
        }
    };

    let task = match tasks::service::set_task_status(
        client,
        table_name,
        task_id,
        payload.status,
        actor,
        payload.failed_reason.as_deref(),
    )
    .await
    {
        Ok(task) => task,
        Err(e) => return e.to_response(),
    };

    tracing::info!(
        "Task {} moved to '{}' by {}",
        task.id,
        task.status,
        actor.id
    );
    respond_with_resolved(client, table_name, task, StatusCode::OK).await
}

/// PATCH /api/tasks/{id} - structured partial field update
pub async fn update_task(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    actor: &Actor,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: tasks::model::UpdateTaskPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return ApiError::Validation(format!("Invalid request body: {}", e)).to_response()
        }
    };

    let task =
        match tasks::service::update_task_fields(client, table_name, task_id, payload, actor).await
        {
            Ok(task) => task,
            Err(e) => return e.to_response(),
        };

    respond_with_resolved(client, table_name, task, StatusCode::OK).await
}

/// DELETE /api/tasks/{id} - permanent removal, distinct from soft delete
pub async fn delete_task(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    if let Err(e) = tasks::service::delete_task(client, table_name, task_id).await {
        return e.to_response();
    }

    json_response(
        StatusCode::OK,
        serde_json::json!({"success": true, "data": {}}),
    )
}

/// Mutations return the record in the same resolved shape the listings
/// use, so the client never has to re-fetch.
async fn respond_with_resolved(
    client: &DynamoClient,
    table_name: &str,
    task: taskdeck_atoms::tasks::model::Task,
    status: StatusCode,
) -> Result<Response<Body>, Error> {
    let user_rows = match users::service::load_all_users(client, table_name).await {
        Ok(rows) => rows,
        Err(e) => return e.to_response(),
    };

    let data = resolve_task(task, &index_users(&user_rows));
    json_response(status, serde_json::json!({"success": true, "data": data}))
}
