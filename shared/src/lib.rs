pub mod auth;
pub mod types;

use aws_sdk_dynamodb::Client as DynamoClient;

/// Shared clients, constructed once at cold start and handed to every
/// request by the lambda entrypoint.
pub struct AppState {
    pub dynamo_client: DynamoClient,
}
