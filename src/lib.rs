pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use repositories::SqliteUserRepository;
use services::UserService;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    /// Users per page on the list endpoint.
    pub page_size: i64,
}

impl AppState {
    /// Wire the SQLite repository and user service over `pool`.
    pub fn new(pool: SqlitePool, page_size: i64) -> Self {
        let user_repository = Arc::new(SqliteUserRepository::new(pool));
        Self {
            user_service: Arc::new(UserService::new(user_repository)),
            page_size,
        }
    }
}
