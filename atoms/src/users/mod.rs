pub mod model;
pub mod service;

pub use model::{Actor, CreateUserPayload, LoginPayload, NewUser, RegisterPayload, Role, User};
pub use service::*;
