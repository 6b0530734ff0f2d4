pub mod user;

pub use user::{NewUser, User, UserFilter, UserListItem, UserResponse};
