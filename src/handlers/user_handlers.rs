use crate::error::{AppError, Result};
use crate::handlers::extractors::JsonBody;
use crate::handlers::pagination::{page_url, request_base_url, PageWindow, Paginated};
use crate::models::{UserFilter, UserListItem, UserResponse};
use crate::services::WriteMode;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

pub const ACTIVATED_STATUS: &str = "User activated successfully";
pub const DEACTIVATED_STATUS: &str = "User deactivated successfully";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListUsersQuery {
    pub is_active: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl ListUsersQuery {
    /// Reads the list parameters from a raw query string. A repeated key
    /// keeps its last value; unknown keys are ignored.
    pub fn from_query(query: Option<&str>) -> Self {
        let pairs: Vec<(String, String)> = query
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();

        let mut parsed = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "is_active" => parsed.is_active = Some(value),
                "search" => parsed.search = Some(value),
                "page" => parsed.page = Some(value),
                _ => {}
            }
        }
        parsed
    }

    fn filter(&self) -> UserFilter {
        UserFilter {
            is_active: self.is_active.as_deref().map(parse_flag),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Body of the activate/deactivate actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub user: UserResponse,
}

/// `true`, `1` and `yes` (any case) select active users; any other value
/// selects inactive ones.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Identifiers that are not integers cannot name a user.
fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|_| AppError::NotFound)
}

/// GET /api/users/ - Paginated, filtered listing
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<Paginated<UserListItem>>> {
    let query = ListUsersQuery::from_query(uri.query());
    let filter = query.filter();
    let count = state.user_service.count_users(&filter).await?;
    let window = PageWindow::resolve(query.page.as_deref(), count, state.page_size)?;

    let users = state
        .user_service
        .list_users(&filter, window.page_size, window.offset())
        .await?;

    let base = request_base_url(&headers, &uri);
    let link = |page: i64| page_url(&base, uri.query(), page);

    Ok(Json(Paginated {
        count,
        next: window.next_page().map(link),
        previous: window.previous_page().map(link),
        results: users.into_iter().map(UserListItem::from).collect(),
    }))
}

/// POST /api/users/ - Create a user
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(data): JsonBody,
) -> Result<impl IntoResponse> {
    let user = state.user_service.create_user(&data).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users/{id}/
pub async fn retrieve_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let user = state.user_service.get_user(parse_id(&id)?).await?;
    Ok(Json(user.into()))
}

/// PUT /api/users/{id}/ - Full update
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(data): JsonBody,
) -> Result<Json<UserResponse>> {
    let id = parse_id(&id)?;
    let user = state
        .user_service
        .update_user(id, &data, WriteMode::Replace)
        .await?;
    Ok(Json(user.into()))
}

/// PATCH /api/users/{id}/ - Partial update
pub async fn partial_update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(data): JsonBody,
) -> Result<Json<UserResponse>> {
    let id = parse_id(&id)?;
    let user = state
        .user_service
        .update_user(id, &data, WriteMode::Partial)
        .await?;
    Ok(Json(user.into()))
}

/// DELETE /api/users/{id}/
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.user_service.delete_user(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/{id}/activate/
pub async fn activate_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let user = state.user_service.activate_user(parse_id(&id)?).await?;
    Ok(Json(StatusResponse {
        status: ACTIVATED_STATUS.to_string(),
        user: user.into(),
    }))
}

/// POST /api/users/{id}/deactivate/
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let user = state.user_service.deactivate_user(parse_id(&id)?).await?;
    Ok(Json(StatusResponse {
        status: DEACTIVATED_STATUS.to_string(),
        user: user.into(),
    }))
}

/// GET /api/users/active_users/ - Every active user, unpaginated
pub async fn active_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = state.user_service.list_active_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values() {
        for value in ["true", "True", "1", "YES", " yes "] {
            assert!(parse_flag(value), "{value:?}");
        }
        for value in ["false", "0", "no", "", "maybe"] {
            assert!(!parse_flag(value), "{value:?}");
        }
    }

    #[test]
    fn query_to_filter() {
        let query = ListUsersQuery {
            is_active: Some("false".to_string()),
            search: Some("  ".to_string()),
            page: None,
        };
        assert_eq!(
            query.filter(),
            UserFilter {
                is_active: Some(false),
                search: None,
            }
        );

        let query = ListUsersQuery {
            search: Some(" Ann ".to_string()),
            ..ListUsersQuery::default()
        };
        assert_eq!(query.filter().search.as_deref(), Some("Ann"));
        assert_eq!(query.filter().is_active, None);
    }

    #[test]
    fn repeated_query_keys_keep_last_value() {
        let query = ListUsersQuery::from_query(Some("search=a&page=1&search=b&page=2&x=1"));
        assert_eq!(
            query,
            ListUsersQuery {
                is_active: None,
                search: Some("b".to_string()),
                page: Some("2".to_string()),
            }
        );
        assert_eq!(ListUsersQuery::from_query(None), ListUsersQuery::default());
        assert_eq!(
            ListUsersQuery::from_query(Some("search=%C3%A9mile+x")).search.as_deref(),
            Some("émile x")
        );
    }

    #[test]
    fn non_integer_ids_are_not_found() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(AppError::NotFound)));
        assert!(matches!(parse_id("1.0"), Err(AppError::NotFound)));
    }
}
