// ========== USER ==========
pub use taskdeck_atoms::users::model::{
    Actor, CreateUserPayload, LoginPayload, NewUser, RegisterPayload, Role, User,
};

// ========== TASK ==========
pub use taskdeck_atoms::tasks::model::{
    CreateTaskPayload, Priority, Task, TaskStatus, UpdateStatusPayload, UpdateTaskPayload,
};

// ========== ERRORS ==========
pub use taskdeck_atoms::error::{ApiError, AuthFailure};
