use crate::models::user::{NewUser, User, UserFilter};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_active, created_at, updated_at";

const DEFAULT_ORDER: &str = " ORDER BY created_at DESC, id DESC";

/// Column whose unique constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl UniqueField {
    pub fn field_name(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::Username => "username",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("Unique constraint violated on {}", .0.field_name())]
    Conflict(UniqueField),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    async fn update_user(&self, user: &User) -> RepositoryResult<User>;
    async fn set_active(&self, id: i64, is_active: bool) -> RepositoryResult<User>;
    async fn delete_user(&self, id: i64) -> RepositoryResult<()>;
    async fn list_users(
        &self,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<User>>;
    async fn count_users(&self, filter: &UserFilter) -> RepositoryResult<i64>;
    async fn list_active(&self) -> RepositoryResult<Vec<User>>;
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> RepositoryResult<bool>;
    async fn username_exists(
        &self,
        username: &str,
        exclude_id: Option<i64>,
    ) -> RepositoryResult<bool>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let mut user = user.clone();
        user.normalize();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, username_search, email, first_name, last_name, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(search_key(&user.username))
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => {
                let id = res.last_insert_rowid();
                self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
            }
            Err(e) => Err(map_write_error(e)),
        }
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<User> {
        let mut user = user.clone();
        user.normalize();
        // Never let the refresh land before the insert timestamp.
        let now = Utc::now().max(user.created_at);

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, username_search = ?, email = ?, first_name = ?, last_name = ?,
                is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(search_key(&user.username))
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(now)
        .bind(user.id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => {
                if res.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound);
                }
                self.find_by_id(user.id)
                    .await?
                    .ok_or(RepositoryError::NotFound)
            }
            Err(e) => Err(map_write_error(e)),
        }
    }

    async fn set_active(&self, id: i64, is_active: bool) -> RepositoryResult<User> {
        let mut user = self
            .find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        user.is_active = is_active;
        self.update_user(&user).await
    }

    async fn delete_user(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<User>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(DEFAULT_ORDER);
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn count_users(&self, filter: &UserFilter) -> RepositoryResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_active(&self) -> RepositoryResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE is_active = 1{}",
            USER_COLUMNS, DEFAULT_ORDER
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> RepositoryResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email = ? AND (? IS NULL OR id != ?)",
        )
        .bind(email.to_lowercase())
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn username_exists(
        &self,
        username: &str,
        exclude_id: Option<i64>,
    ) -> RepositoryResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE username = ? AND (? IS NULL OR id != ?)",
        )
        .bind(username)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    let mut keyword = " WHERE ";

    if let Some(is_active) = filter.is_active {
        builder.push(keyword).push("is_active = ").push_bind(is_active);
        keyword = " AND ";
    }

    // SQLite only folds ASCII, so both columns hold text lowercased on write.
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(&search_key(search)));
        builder
            .push(keyword)
            .push("(username_search LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// Case-folded form that search terms and `username_search` are compared in.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Makes `%`, `_` and `\` match literally inside a LIKE pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if db_err.is_unique_violation() || message.contains("UNIQUE constraint failed") {
            if message.contains("users.email") {
                return RepositoryError::Conflict(UniqueField::Email);
            }
            if message.contains("users.username") {
                return RepositoryError::Conflict(UniqueField::Username);
            }
        }
    }
    RepositoryError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn search_key_folds_non_ascii() {
        assert_eq!(search_key("ÉMILE"), "émile");
        assert_eq!(search_key("Straße"), "straße");
    }

    #[test]
    fn unique_field_names() {
        assert_eq!(UniqueField::Email.field_name(), "email");
        assert_eq!(UniqueField::Username.field_name(), "username");
    }
}
