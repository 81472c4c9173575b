
// Re-export model types, the workflow engine and service functions
pub mod model;
pub mod service;
pub mod workflow;

pub use model::{
    CreateTaskPayload, Priority, Task, TaskStatus, UpdateStatusPayload, UpdateTaskPayload,
};
pub use service::*;
pub use workflow::{apply_transition, is_transition_allowed};
