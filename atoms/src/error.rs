use lambda_http::{http::StatusCode, Body, Response};
use thiserror::Error;

/// Why a 401 happened. The client clears its session and redirects to
/// login on `ExpiredToken`/`InvalidToken`, but keeps state for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    BadCredentials,
}

/// Error taxonomy shared by the workflow engine, services and handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Authentication { message: String, cause: AuthFailure },

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Persistence(String),
}

impl ApiError {
    pub fn missing_token() -> Self {
        ApiError::Authentication {
            message: "No token, authorization denied".to_string(),
            cause: AuthFailure::MissingToken,
        }
    }

    pub fn invalid_token() -> Self {
        ApiError::Authentication {
            message: "Invalid token. Please log in again.".to_string(),
            cause: AuthFailure::InvalidToken,
        }
    }

    pub fn expired_token() -> Self {
        ApiError::Authentication {
            message: "Token expired. Please log in again.".to_string(),
            cause: AuthFailure::ExpiredToken,
        }
    }

    pub fn bad_credentials() -> Self {
        ApiError::Authentication {
            message: "Invalid email or password".to_string(),
            cause: AuthFailure::BadCredentials,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind for clients and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Authentication { .. } => "authentication",
            ApiError::Authorization(_) => "authorization",
            ApiError::Conflict(_) => "conflict",
            ApiError::Persistence(_) => "persistence",
        }
    }

    /// Render as the `{"success": false, "error": ...}` envelope the
    /// client expects. 401s carry `expired`/`invalid` flags so the client
    /// can tell a stale session from a broken one.
    pub fn to_response(&self) -> Result<Response<Body>, lambda_http::Error> {
        if let ApiError::Persistence(msg) = self {
            tracing::error!("Persistence failure: {}", msg);
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if let ApiError::Authentication { cause, .. } = self {
            match cause {
                AuthFailure::ExpiredToken => body["expired"] = serde_json::json!(true),
                AuthFailure::InvalidToken => body["invalid"] = serde_json::json!(true),
                _ => {}
            }
        }

        Ok(Response::builder()
            .status(self.status_code())
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(body.to_string().into())
            .map_err(Box::new)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::expired_token().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Authorization("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Persistence("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ApiError::Validation("x".into()).kind(), "validation");
        assert_eq!(ApiError::bad_credentials().kind(), "authentication");
        assert_eq!(ApiError::Conflict("x".into()).kind(), "conflict");
    }

    #[test]
    fn expired_and_invalid_are_distinguished() {
        let expired = ApiError::expired_token();
        let invalid = ApiError::invalid_token();
        assert!(matches!(
            expired,
            ApiError::Authentication { cause: AuthFailure::ExpiredToken, .. }
        ));
        assert!(matches!(
            invalid,
            ApiError::Authentication { cause: AuthFailure::InvalidToken, .. }
        ));
        assert_ne!(expired.to_string(), invalid.to_string());
    }
}
