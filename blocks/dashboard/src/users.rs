use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use taskdeck_atoms::{tasks, users};
use taskdeck_shared::auth;
use taskdeck_shared::types::{Actor, ApiError, CreateUserPayload, NewUser, Role};

use crate::json_response;

/// GET /api/users - employees offered for task assignment. Passwords
/// never serialize out of the User model.
pub async fn list_employees(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    let employees = match users::service::load_employees(client, table_name).await {
        Ok(rows) => rows,
        Err(e) => return e.to_response(),
    };

    json_response(
        StatusCode::OK,
        serde_json::json!({"success": true, "data": employees}),
    )
}

/// POST /api/users/create - provision an employee, optionally with seed
/// tasks assigned to them in the same request.
///
/// If account creation fails nothing else happens. Once the account
/// exists, each seed task is attempted on its own: a task that fails
/// validation is reported per item and does not roll back the account or
/// its siblings.
pub async fn create_user_with_tasks(
    client: &DynamoClient,
    table_name: &str,
    actor: &Actor,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateUserPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return ApiError::Validation(format!("Invalid request body: {}", e)).to_response()
        }
    };

    if payload.name.trim().is_empty() {
        return ApiError::Validation("Name is required".to_string()).to_response();
    }
    if payload.email.trim().is_empty() {
        return ApiError::Validation("Email is required".to_string()).to_response();
    }
    if payload.password.is_empty() {
        return ApiError::Validation("Password is required".to_string()).to_response();
    }

    let salt = uuid::Uuid::new_v4().simple().to_string();
    let password_hash = auth::hash_password(&payload.password, &salt);

    let user = match users::service::create_user(
        client,
        table_name,
        NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            password_salt: salt,
            role: payload.role.unwrap_or(Role::Employee),
        },
    )
    .await
    {
        Ok(user) => user,
        Err(e) => return e.to_response(),
    };

    // Seed tasks are assigned to the new employee and credited to the
    // provisioning admin; failures are collected, not fatal
    let mut task_results = Vec::new();
    for mut seed in payload.tasks {
        seed.assigned_to = Some(user.id.clone());
        match tasks::service::create_task(client, table_name, seed, &actor.id).await {
            Ok(task) => {
                task_results.push(serde_json::json!({"success": true, "data": task}));
            }
            Err(e) => {
                tracing::warn!("Seed task for user {} rejected: {}", user.id, e);
                task_results.push(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "kind": e.kind(),
                }));
            }
        }
    }

    tracing::info!(
        "User {} provisioned by {} with {} seed task(s)",
        user.id,
        actor.id,
        task_results.len()
    );

    json_response(
        StatusCode::CREATED,
        serde_json::json!({"success": true, "user": user, "tasks": task_results}),
    )
}
