use lambda_http::{run, service_fn, Error};
use std::sync::Arc;
use taskdeck_shared::AppState;

mod http_handler;
use http_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_http::tracing::init_default_subscriber();

    let config = aws_config::load_from_env().await;
    let state = Arc::new(AppState {
        dynamo_client: aws_sdk_dynamodb::Client::new(&config),
    });

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
