pub mod extractors;
pub mod pagination;
pub mod user_handlers;

pub use user_handlers::{
    activate_user, active_users, create_user, deactivate_user, delete_user, list_users,
    partial_update_user, retrieve_user, update_user,
};
