use aws_sdk_dynamodb::Client as DynamoClient;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use lambda_http::http::{HeaderMap, StatusCode};
use lambda_http::{Body, Error, Response};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use taskdeck_atoms::error::{ApiError, AuthFailure};
use taskdeck_atoms::users::model::{Actor, LoginPayload, NewUser, RegisterPayload, Role, User};
use taskdeck_atoms::users::service as users;

type HmacSha256 = Hmac<Sha256>;

/// Sessions last 10 days; the client re-logs-in after that
pub const TOKEN_TTL_SECS: i64 = 10 * 24 * 60 * 60;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The verified caller: the full user record plus the identity claim
/// handed to the domain layer.
pub struct AuthContext {
    pub user: User,
    pub actor: Actor,
}

fn hmac_tag(key: &[u8], data: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac
}

/// Salted password hash. The mechanics stay behind this function and
/// `verify_password`; nothing else handles raw passwords.
pub fn hash_password(password: &str, salt: &str) -> String {
    let tag = hmac_tag(salt.as_bytes(), password.as_bytes())
        .finalize()
        .into_bytes();
    STANDARD.encode(tag)
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let expected = match STANDARD.decode(expected_hash) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    hmac_tag(salt.as_bytes(), password.as_bytes())
        .verify_slice(&expected)
        .is_ok()
}

fn sign_claims(claims: &Claims, key: &str) -> Result<String, ApiError> {
    let header = URL_SAFE_NO_PAD.encode(TOKEN_HEADER);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(claims)
            .map_err(|e| ApiError::Persistence(format!("Token encoding error: {}", e)))?,
    );
    let signing_input = format!("{}.{}", header, payload);
    let tag = hmac_tag(key.as_bytes(), signing_input.as_bytes())
        .finalize()
        .into_bytes();
    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(tag)))
}

pub fn issue_token(user: &User, key: &str) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.clone(),
        role: user.role,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    sign_claims(&claims, key)
}

/// Verify a compact token. Expired and malformed tokens are distinct
/// failures so the client knows whether to prompt a re-login.
pub fn verify_token(token: &str, key: &str) -> Result<Claims, ApiError> {
    let mut parts = token.split('.');
    let (header, payload, signature) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(ApiError::invalid_token()),
        };

    let signing_input = format!("{}.{}", header, payload);
    let tag = match URL_SAFE_NO_PAD.decode(signature) {
        Ok(tag) => tag,
        Err(_) => return Err(ApiError::invalid_token()),
    };
    if hmac_tag(key.as_bytes(), signing_input.as_bytes())
        .verify_slice(&tag)
        .is_err()
    {
        return Err(ApiError::invalid_token());
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ApiError::invalid_token())?;
    let claims: Claims =
        serde_json::from_slice(&claims_bytes).map_err(|_| ApiError::invalid_token())?;

    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(ApiError::expired_token());
    }

    Ok(claims)
}

/// Authenticate a request from its Authorization header and re-load the
/// user record, so removed accounts stop working immediately.
pub async fn authenticate_request(
    client: &DynamoClient,
    table_name: &str,
    token_key: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, ApiError> {
    let header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(ApiError::missing_token)?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(ApiError::missing_token)?;

    let claims = verify_token(token, token_key)?;

    let user = match users::get_user(client, table_name, &claims.sub).await {
        Ok(user) => user,
        Err(ApiError::NotFound(_)) => {
            return Err(ApiError::Authentication {
                message: "User not found. Please log in again.".to_string(),
                cause: AuthFailure::InvalidToken,
            })
        }
        Err(e) => return Err(e),
    };

    let actor = user.actor();
    Ok(AuthContext { user, actor })
}

pub fn require_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Authorization(
            "Not authorized as an admin".to_string(),
        ))
    }
}

/// POST /api/auth/login
pub async fn login(
    client: &DynamoClient,
    table_name: &str,
    token_key: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: LoginPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            return ApiError::Validation(format!("Invalid request body: {}", e)).to_response()
        }
    };

    let user = match users::find_user_by_email(client, table_name, &payload.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return ApiError::bad_credentials().to_response(),
        Err(e) => return e.to_response(),
    };

    if !verify_password(&payload.password, &user.password_salt, &user.password_hash) {
        return ApiError::bad_credentials().to_response();
    }

    let token = match issue_token(&user, token_key) {
        Ok(token) => token,
        Err(e) => return e.to_response(),
    };

    tracing::info!("User {} logged in", user.id);

    let resp = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({
                "success": true,
                "token": token,
                "user": {
                    "id": user.id,
                    "name": user.name,
                    "email": user.email,
                    "role": user.role,
                },
            })
            .to_string()
            .into(),
        )
        .map_err(Box::new)?;
    Ok(resp)
}

/// POST /api/auth/register
pub async fn register(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: RegisterPayload = match serde_json::from_slice(body) {
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

    // The first account ever registered becomes the admin
    let role = match users::count_users(client, table_name).await {
        Ok(0) => Role::Admin,
        Ok(_) => payload.role.unwrap_or(Role::Employee),
        Err(e) => return e.to_response(),
    };

    let salt = uuid::Uuid::new_v4().simple().to_string();
    let password_hash = hash_password(&payload.password, &salt);

    let user = match users::create_user(
        client,
        table_name,
        NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            password_salt: salt,
            role,
        },
    )
    .await
    {
        Ok(user) => user,
        Err(e) => return e.to_response(),
    };

    tracing::info!("Registered user {} with role {}", user.id, user.role.as_str());

    let resp = Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": true, "message": "User created successfully"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?;
    Ok(resp)
}

/// GET /api/auth/verify - echo the authenticated user back to the client
pub fn verify(ctx: &AuthContext) -> Result<Response<Body>, Error> {
    let resp = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": true, "user": &ctx.user})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?;
    Ok(resp)
}
