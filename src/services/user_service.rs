use crate::models::user::{NewUser, User, UserFilter};
use crate::repositories::user_repository::{RepositoryError, UniqueField, UserRepository};
use crate::services::validation::{
    expect_object, parse_bool, parse_char, CharRules, FieldErrors, NULL, REQUIRED,
};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const EMAIL_TAKEN: &str = "A user with this email already exists.";
pub const USERNAME_TAKEN: &str = "A user with this username already exists.";

const USERNAME_RULES: CharRules = CharRules::required(150).min_length(3);
const EMAIL_RULES: CharRules = CharRules::required(254).email();
const NAME_RULES: CharRules = CharRules::optional(100);

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),
    #[error("User not found")]
    UserNotFound,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// How much of the payload a write has to supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    /// PUT: required fields must be present, missing optional fields keep
    /// their stored values.
    Replace,
    /// PATCH: only supplied fields are validated and applied.
    Partial,
}

impl WriteMode {
    fn enforces_required(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Field values that passed validation. `None` means the key was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl ValidatedUser {
    fn into_new_user(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.username.is_none() {
            errors.add("username", REQUIRED);
        }
        if self.email.is_none() {
            errors.add("email", REQUIRED);
        }

        match (self.username, self.email) {
            (Some(username), Some(email)) => Ok(NewUser {
                username,
                email,
                first_name: self.first_name.flatten(),
                last_name: self.last_name.flatten(),
                is_active: self.is_active.unwrap_or(true),
            }),
            _ => Err(errors),
        }
    }

    fn apply_to(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, data: &Value) -> Result<User, UserServiceError> {
        let validated = self.validate(data, None, WriteMode::Create).await?;
        let new_user = validated
            .into_new_user()
            .map_err(UserServiceError::Validation)?;

        match self.repository.create_user(&new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user, "user created");
                Ok(user)
            }
            Err(RepositoryError::Conflict(field)) => Err(conflict_error(field)),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn get_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    pub async fn update_user(
        &self,
        id: i64,
        data: &Value,
        mode: WriteMode,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get_user(id).await?;
        let validated = self.validate(data, Some(&user), mode).await?;
        validated.apply_to(&mut user);

        match self.repository.update_user(&user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, ?mode, "user updated");
                Ok(user)
            }
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(RepositoryError::Conflict(field)) => Err(conflict_error(field)),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.delete_user(id).await {
            Ok(()) => {
                tracing::info!(user_id = id, "user deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn activate_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.set_active(id, true).await
    }

    pub async fn deactivate_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: i64, is_active: bool) -> Result<User, UserServiceError> {
        match self.repository.set_active(id, is_active).await {
            Ok(user) => {
                tracing::info!(user_id = id, is_active, "user active flag set");
                Ok(user)
            }
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(RepositoryError::Conflict(field)) => Err(conflict_error(field)),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn list_users(
        &self,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(filter, limit, offset).await?)
    }

    pub async fn count_users(&self, filter: &UserFilter) -> Result<i64, UserServiceError> {
        Ok(self.repository.count_users(filter).await?)
    }

    pub async fn list_active_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_active().await?)
    }

    /// Runs field-level validation for every known field, then object-level
    /// validation once all fields passed.
    ///
    /// `instance` is the stored row for updates; uniqueness checks skip it.
    pub async fn validate(
        &self,
        data: &Value,
        instance: Option<&User>,
        mode: WriteMode,
    ) -> Result<ValidatedUser, UserServiceError> {
        let object = expect_object(data).map_err(UserServiceError::Validation)?;
        let exclude_id = instance.map(|user| user.id);
        let mut errors = FieldErrors::new();
        let mut validated = ValidatedUser::default();

        if let Some(username) = required_char(&mut errors, object, "username", &USERNAME_RULES, mode)
        {
            if self
                .repository
                .username_exists(&username, exclude_id)
                .await?
            {
                errors.add("username", USERNAME_TAKEN);
            } else {
                validated.username = Some(username);
            }
        }

        if let Some(email) = required_char(&mut errors, object, "email", &EMAIL_RULES, mode) {
            let email = email.to_lowercase();
            if self.repository.email_exists(&email, exclude_id).await? {
                errors.add("email", EMAIL_TAKEN);
            } else {
                validated.email = Some(email);
            }
        }

        validated.first_name = optional_char(&mut errors, object, "first_name", &NAME_RULES);
        validated.last_name = optional_char(&mut errors, object, "last_name", &NAME_RULES);

        if let Some(value) = object.get("is_active") {
            match parse_bool(value) {
                Ok(is_active) => validated.is_active = Some(is_active),
                Err(messages) => errors.extend("is_active", messages),
            }
        }

        if !errors.is_empty() {
            tracing::debug!(%errors, "user payload rejected");
            return Err(UserServiceError::Validation(errors));
        }

        self.validate_object(&validated)
            .map_err(UserServiceError::Validation)?;

        Ok(validated)
    }

    /// Cross-field rules. None are enforced yet.
    pub fn validate_object(&self, _validated: &ValidatedUser) -> Result<(), FieldErrors> {
        Ok(())
    }
}

fn required_char(
    errors: &mut FieldErrors,
    object: &Map<String, Value>,
    field: &str,
    rules: &CharRules,
    mode: WriteMode,
) -> Option<String> {
    let Some(value) = object.get(field) else {
        if mode.enforces_required() {
            errors.add(field, REQUIRED);
        }
        return None;
    };

    match parse_char(value, rules) {
        Ok(Some(text)) => Some(text),
        Ok(None) => {
            errors.add(field, NULL);
            None
        }
        Err(messages) => {
            errors.extend(field, messages);
            None
        }
    }
}

fn optional_char(
    errors: &mut FieldErrors,
    object: &Map<String, Value>,
    field: &str,
    rules: &CharRules,
) -> Option<Option<String>> {
    let value = object.get(field)?;
    match parse_char(value, rules) {
        Ok(text) => Some(text),
        Err(messages) => {
            errors.extend(field, messages);
            None
        }
    }
}

/// A concurrent writer got past the pre-check first; report it the same way.
fn conflict_error(field: UniqueField) -> UserServiceError {
    tracing::warn!(
        field = field.field_name(),
        "unique constraint rejected a write that passed the pre-check"
    );
    let message = match field {
        UniqueField::Email => EMAIL_TAKEN,
        UniqueField::Username => USERNAME_TAKEN,
    };
    UserServiceError::Validation(FieldErrors::single(field.field_name(), message))
}
