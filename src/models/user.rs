use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// One row of the `users` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Applied to every row before it is written.
    pub fn normalize(&mut self) {
        self.email = self.email.to_lowercase();
    }

    /// "First Last" when both names are set, the first name alone when only
    /// it is set, otherwise the username.
    pub fn full_name(&self) -> String {
        let first = non_empty(self.first_name.as_deref());
        let last = non_empty(self.last_name.as_deref());

        match (first, last) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            _ => self.username.clone(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Values for a row that does not exist yet. `id` and timestamps are assigned
/// on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
}

impl NewUser {
    pub fn normalize(&mut self) {
        self.email = self.email.to_lowercase();
    }
}

/// Collection filters for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub is_active: Option<bool>,
    /// Case-insensitive substring matched against username or email.
    pub search: Option<String>,
}

/// Detail representation returned by every single-user endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Reduced representation used in paginated listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserListItem {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "ann".to_string(),
            email: "Ann@Example.COM".to_string(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn full_name_uses_both_names() {
        assert_eq!(user(Some("Ann"), Some("Lee")).full_name(), "Ann Lee");
    }

    #[test]
    fn full_name_falls_back_to_first_name() {
        assert_eq!(user(Some("Ann"), None).full_name(), "Ann");
        assert_eq!(user(Some("Ann"), Some("")).full_name(), "Ann");
    }

    #[test]
    fn full_name_falls_back_to_username() {
        assert_eq!(user(None, None).full_name(), "ann");
        assert_eq!(user(Some(""), Some("")).full_name(), "ann");
        assert_eq!(user(None, Some("Lee")).full_name(), "ann");
    }

    #[test]
    fn display_is_username() {
        assert_eq!(user(None, None).to_string(), "ann");
    }

    #[test]
    fn normalize_lowercases_email() {
        let mut u = user(None, None);
        u.normalize();
        assert_eq!(u.email, "ann@example.com");

        let mut new_user = NewUser {
            username: "bob".to_string(),
            email: "BOB@Example.com".to_string(),
            first_name: None,
            last_name: None,
            is_active: true,
        };
        new_user.normalize();
        assert_eq!(new_user.email, "bob@example.com");
    }

    #[test]
    fn list_item_drops_detail_fields() {
        let u = user(Some("Ann"), Some("Lee"));
        let item = UserListItem::from(u.clone());
        let json = serde_json::to_value(&item).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert!(obj.contains_key("created_at"));
        assert!(!obj.contains_key("first_name"));
        assert!(!obj.contains_key("updated_at"));
    }

    #[test]
    fn response_includes_full_name() {
        let response = UserResponse::from(user(Some("Ann"), Some("Lee")));
        assert_eq!(response.full_name, "Ann Lee");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["full_name"], "Ann Lee");
        assert!(json["last_name"].is_string());
    }
}
