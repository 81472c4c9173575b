pub mod tasks;
pub mod types;
pub mod users;

use lambda_http::{http::StatusCode, Body, Error, Response};

pub(crate) fn json_response(
    status: StatusCode,
    body: serde_json::Value,
) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(body.to_string().into())
        .map_err(Box::new)?)
}
