pub mod test_helpers {
    use crate::repositories::user_repository::search_key;
    use chrono::{DateTime, Utc};
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use tempfile::NamedTempFile;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when data has to outlive a single pool
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let pool = connect_file(&temp_file).await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Open another pool on a database created by `create_test_db_file`
    pub async fn connect_file(file: &NamedTempFile) -> Result<SqlitePool, sqlx::Error> {
        let db_path = file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        let database_url = format!("sqlite://{}", db_path);

        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
    }

    /// Insert a test user directly, bypassing validation
    pub async fn insert_test_user(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        is_active: bool,
    ) -> Result<i64, sqlx::Error> {
        insert_test_user_at(pool, username, email, is_active, Utc::now()).await
    }

    /// Insert a test user with a fixed creation time
    pub async fn insert_test_user_at(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, username_search, email, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(search_key(username))
        .bind(email)
        .bind(is_active)
        .bind(created_at)
        .bind(created_at)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

