use serde::{Deserialize, Serialize};

/// Closed role set. Stored and sent as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// Verified identity claim attached to every mutating call. Produced by
/// the auth boundary; the domain layer trusts it without re-verifying.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Salted hash, never serialized to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub password_salt: String,
    pub role: Role,
    pub created_at: String,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            role: self.role,
        }
    }
}

/// Record handed to the service layer after the password has been hashed.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

/// Admin provisioning payload: a new employee plus optional seed tasks
/// assigned to them in the same request.
#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
    #[serde(default)]
    pub tasks: Vec<crate::tasks::model::CreateTaskPayload>,
}
