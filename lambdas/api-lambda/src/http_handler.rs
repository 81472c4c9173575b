use dashboard_block::{tasks, users};
use lambda_http::http::header::HeaderValue;
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use std::env;
use std::sync::Arc;
use taskdeck_shared::{auth, AppState};

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

/// Main Lambda handler - routes requests to auth, task or user endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("🚀 API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "taskdeck".to_string());
    let token_key = env::var("TOKEN_KEY").expect("TOKEN_KEY must be set");

    // Auth endpoints (no token required except /verify)
    if path.starts_with("/api/auth") {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        return match (method, parts.as_slice()) {
            (&Method::POST, ["api", "auth", "login"]) => finalize_response(
                auth::login(&state.dynamo_client, &table_name, &token_key, body).await,
            ),
            (&Method::POST, ["api", "auth", "register"]) => {
                finalize_response(auth::register(&state.dynamo_client, &table_name, body).await)
            }
            (&Method::GET, ["api", "auth", "verify"]) => {
                let ctx = match auth::authenticate_request(
                    &state.dynamo_client,
                    &table_name,
                    &token_key,
                    event.headers(),
                )
                .await
                {
                    Ok(ctx) => ctx,
                    Err(e) => return finalize_response(e.to_response()),
                };
                finalize_response(auth::verify(&ctx))
            }
            _ => finalize_response(not_found()),
        };
    }

    // Everything below requires a verified identity
    let ctx = match auth::authenticate_request(
        &state.dynamo_client,
        &table_name,
        &token_key,
        event.headers(),
    )
    .await
    {
        Ok(ctx) => ctx,
        Err(e) => return finalize_response(e.to_response()),
    };
    let actor = ctx.actor;

    // Task routes
    if path.starts_with("/api/tasks") {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let resp = match (method, parts.as_slice()) {
            // GET /api/tasks - full board, admin only
            (&Method::GET, ["api", "tasks"]) => match auth::require_admin(&actor) {
                Ok(()) => tasks::list_all_tasks(&state.dynamo_client, &table_name).await,
                Err(e) => e.to_response(),
            },
            // POST /api/tasks - create task, admin only
            (&Method::POST, ["api", "tasks"]) => match auth::require_admin(&actor) {
                Ok(()) => {
                    tasks::create_task(&state.dynamo_client, &table_name, &actor, body).await
                }
                Err(e) => e.to_response(),
            },
            // GET /api/tasks/user/{id} - one user's assignments
            (&Method::GET, ["api", "tasks", "user", user_id]) => {
                tasks::list_user_tasks(&state.dynamo_client, &table_name, user_id, &actor).await
            }
            // PATCH /api/tasks/{id}/status - workflow transition
            (&Method::PATCH, ["api", "tasks", task_id, "status"]) => {
                tasks::update_task_status(&state.dynamo_client, &table_name, task_id, &actor, body)
                    .await
            }
            // PATCH /api/tasks/{id} - field update
            (&Method::PATCH, ["api", "tasks", task_id]) => {
                tasks::update_task(&state.dynamo_client, &table_name, task_id, &actor, body).await
            }
            // DELETE /api/tasks/{id} - hard delete, admin only
            (&Method::DELETE, ["api", "tasks", task_id]) => match auth::require_admin(&actor) {
                Ok(()) => tasks::delete_task(&state.dynamo_client, &table_name, task_id).await,
                Err(e) => e.to_response(),
            },
            _ => not_found(),
        };

        return finalize_response(resp);
    }

    // User routes
    if path.starts_with("/api/users") {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let resp = match (method, parts.as_slice()) {
            // GET /api/users - employees for assignment pickers
            (&Method::GET, ["api", "users"]) => {
                users::list_employees(&state.dynamo_client, &table_name).await
            }
            // POST /api/users/create - provision employee (+ seed tasks), admin only
            (&Method::POST, ["api", "users", "create"]) => match auth::require_admin(&actor) {
                Ok(()) => {
                    users::create_user_with_tasks(&state.dynamo_client, &table_name, &actor, body)
                        .await
                }
                Err(e) => e.to_response(),
            },
            _ => not_found(),
        };

        return finalize_response(resp);
    }

    // No matching route
    tracing::warn!("⚠️ No route matched - Method: {} Path: {}", method, path);
    finalize_response(not_found())
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": false, "error": "Not found"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}
