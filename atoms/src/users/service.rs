use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::model::{NewUser, Role, User};
use crate::error::ApiError;

/// All user records share one partition; items are keyed USER#{id}.
/// Email uniqueness is held by marker items under EMAIL#{email}.
const USER_PK: &str = "USER";

fn user_sk(user_id: &str) -> String {
    format!("USER#{}", user_id)
}

fn email_pk(email: &str) -> String {
    format!("EMAIL#{}", email.trim().to_lowercase())
}

fn get_s(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.to_string())
}

fn user_from_item(item: &HashMap<String, AttributeValue>) -> Result<User, ApiError> {
    let sk = get_s(item, "SK").unwrap_or_default();
    let id = sk.strip_prefix("USER#").unwrap_or_default().to_string();

    let role_raw = get_s(item, "role").unwrap_or_default();
    let role = Role::parse(&role_raw).ok_or_else(|| {
        ApiError::Persistence(format!("Invalid user role '{}' in store", role_raw))
    })?;

    Ok(User {
        id,
        name: get_s(item, "name").unwrap_or_default(),
        email: get_s(item, "email").unwrap_or_default(),
        password_hash: get_s(item, "password_hash").unwrap_or_default(),
        password_salt: get_s(item, "password_salt").unwrap_or_default(),
        role,
        created_at: get_s(item, "created_at").unwrap_or_default(),
    })
}

/// Create a user, claiming the email marker first so duplicate emails
/// lose the race instead of shadowing an existing account.
pub async fn create_user(
    client: &DynamoClient,
    table_name: &str,
    new_user: NewUser,
) -> Result<User, ApiError> {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let pk = email_pk(&new_user.email);

    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk.clone()))
        .item("SK", AttributeValue::S(pk))
        .item("user_id", AttributeValue::S(user_id.clone()))
        .condition_expression("attribute_not_exists(PK)")
        .send()
        .await
        .map_err(|e| {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                ApiError::Validation("User already exists".to_string())
            } else {
                ApiError::Persistence(format!("DynamoDB put_item error: {}", service_err))
            }
        })?;

    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(USER_PK.to_string()))
        .item("SK", AttributeValue::S(user_sk(&user_id)))
        .item("name", AttributeValue::S(new_user.name.clone()))
        .item("email", AttributeValue::S(new_user.email.clone()))
        .item(
            "password_hash",
            AttributeValue::S(new_user.password_hash.clone()),
        )
        .item(
            "password_salt",
            AttributeValue::S(new_user.password_salt.clone()),
        )
        .item("role", AttributeValue::S(new_user.role.as_str().to_string()))
        .item("created_at", AttributeValue::S(now.clone()))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB put_item error: {}", e)))?;

    Ok(User {
        id: user_id,
        name: new_user.name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        password_salt: new_user.password_salt,
        role: new_user.role,
        created_at: now,
    })
}

pub async fn get_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<User, ApiError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(USER_PK.to_string()))
        .key("SK", AttributeValue::S(user_sk(user_id)))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB get_item error: {}", e)))?;

    match result.item() {
        Some(item) => user_from_item(item),
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

/// Look up a user through the email marker; None when no account exists
pub async fn find_user_by_email(
    client: &DynamoClient,
    table_name: &str,
    email: &str,
) -> Result<Option<User>, ApiError> {
    let pk = email_pk(email);
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB get_item error: {}", e)))?;

    let user_id = match result.item().and_then(|item| get_s(item, "user_id")) {
        Some(id) => id,
        None => return Ok(None),
    };

    match get_user(client, table_name, &user_id).await {
        Ok(user) => Ok(Some(user)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn load_all_users(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<User>, ApiError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(USER_PK.to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("USER#".to_string()))
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB query error: {}", e)))?;

    let mut users = Vec::new();
    for item in result.items() {
        users.push(user_from_item(item)?);
    }
    Ok(users)
}

/// Only employees are offered for task assignment
pub async fn load_employees(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<User>, ApiError> {
    let mut users = load_all_users(client, table_name).await?;
    users.retain(|u| u.role == Role::Employee);
    Ok(users)
}

/// Used by registration: the very first account becomes the admin
pub async fn count_users(client: &DynamoClient, table_name: &str) -> Result<usize, ApiError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(USER_PK.to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("USER#".to_string()))
        .select(Select::Count)
        .send()
        .await
        .map_err(|e| ApiError::Persistence(format!("DynamoDB query error: {}", e)))?;

    Ok(result.count() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_marker_is_case_insensitive() {
        assert_eq!(email_pk("Ada@Example.COM"), "EMAIL#ada@example.com");
        assert_eq!(email_pk("  ada@example.com "), "EMAIL#ada@example.com");
    }

    #[test]
    fn user_item_parsing_requires_a_known_role() {
        let mut item = HashMap::new();
        item.insert(
            "SK".to_string(),
            AttributeValue::S("USER#u1".to_string()),
        );
        item.insert("name".to_string(), AttributeValue::S("Ada".to_string()));
        item.insert(
            "email".to_string(),
            AttributeValue::S("ada@example.com".to_string()),
        );
        item.insert(
            "role".to_string(),
            AttributeValue::S("employee".to_string()),
        );

        let user = user_from_item(&item).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, Role::Employee);

        item.insert("role".to_string(), AttributeValue::S("root".to_string()));
        assert!(matches!(
            user_from_item(&item),
            Err(ApiError::Persistence(_))
        ));
    }
}
