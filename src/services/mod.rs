pub mod user_service;
pub mod validation;

pub use user_service::{UserService, UserServiceError, ValidatedUser, WriteMode};
pub use validation::FieldErrors;
