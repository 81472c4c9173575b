use serde::Serialize;
use std::collections::HashMap;

use taskdeck_atoms::tasks::model::{Priority, Task, TaskStatus};
use taskdeck_atoms::users::model::User;

/// Display-friendly actor reference: what the dashboard shows instead of
/// a raw user id.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserSummary {
    pub fn from_user(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A task with its actor references resolved for display. Unknown ids
/// resolve to null rather than failing the listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: Option<UserSummary>,
    pub created_by: Option<UserSummary>,
    pub deleted_by: Option<UserSummary>,
    pub category: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub failed_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub revision: u64,
}

pub fn resolve_task(task: Task, users_by_id: &HashMap<String, UserSummary>) -> ResolvedTask {
    let lookup = |id: &Option<String>| {
        id.as_ref().and_then(|id| users_by_id.get(id)).cloned()
    };

    ResolvedTask {
        assigned_to: lookup(&task.assigned_to),
        created_by: users_by_id.get(&task.created_by).cloned(),
        deleted_by: lookup(&task.deleted_by),
        id: task.id,
        title: task.title,
        description: task.description,
        status: task.status,
        category: task.category,
        due_date: task.due_date,
        priority: task.priority,
        failed_reason: task.failed_reason,
        created_at: task.created_at,
        updated_at: task.updated_at,
        revision: task.revision,
    }
}

pub fn index_users(users: &[User]) -> HashMap<String, UserSummary> {
    users
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from_user(u)))
        .collect()
}

pub fn resolve_tasks(tasks: Vec<Task>, users: &[User]) -> Vec<ResolvedTask> {
    let users_by_id = index_users(users);
    tasks
        .into_iter()
        .map(|task| resolve_task(task, &users_by_id))
        .collect()
}
