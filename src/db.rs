use crate::config::AppConfig;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

pub async fn create_pool(config: &AppConfig) -> Result<SqlitePool, sqlx::Error> {
    let database_url = &config.database_url;

    let path = file_path(database_url);

    // Ensure the data directory exists
    if let Some(path) = path {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // Every in-memory connection opens a separate, empty database.
    let max_connections = if path.is_some() {
        config.max_connections
    } else {
        1
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::info!(url = %database_url, max_connections, "database pool ready");

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

/// Filesystem path of a file-backed SQLite URL; `None` for in-memory databases.
fn file_path(database_url: &str) -> Option<&str> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_path_strips_scheme_and_query() {
        assert_eq!(file_path("sqlite://data/users.db"), Some("data/users.db"));
        assert_eq!(file_path("sqlite:users.db?mode=rwc"), Some("users.db"));
        assert_eq!(file_path("sqlite::memory:"), None);
        assert_eq!(file_path(":memory:"), None);
    }

    #[tokio::test]
    async fn creates_pool_for_in_memory_database() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..AppConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn in_memory_pool_shares_one_connection() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
            ..AppConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);

        run_migrations(&pool).await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                    .fetch_one(&pool)
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn file_pool_keeps_configured_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_url: format!("sqlite://{}", dir.path().join("pool.db").display()),
            max_connections: 3,
            ..AppConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 3);
    }
}
