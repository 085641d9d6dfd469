/// Error types for Blog Service
///
/// Every failure a request can hit is one of these kinds. They are converted to
/// HTTP responses at the handler boundary: a missing login becomes a redirect,
/// an ownership failure a hard 403, and form problems a re-render with
/// per-field messages.
use actix_web::{http::header, http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Login page that anonymous actors are sent to.
pub const LOGIN_URL: &str = "/login";

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Field-keyed validation messages, e.g. `email -> ["Enter a valid email address."]`.
///
/// Form-wide messages are stored under [`FieldErrors::NON_FIELD`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise a re-render of `form`.
    pub fn into_result(self, form: serde_json::Value) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation { errors: self, form })
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errs: validator::ValidationErrors) -> Self {
        let mut errors = FieldErrors::new();
        for (field, field_errors) in errs.field_errors() {
            for err in field_errors {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                errors.add(&field.to_string(), message);
            }
        }
        errors
    }
}

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// The action needs a logged-in actor. `next` is where to come back to.
    #[error("Authentication required")]
    Unauthenticated { next: Option<String> },

    /// Logged in, but not the owner of the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Request body could not be read at all
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Form input rejected; `form` echoes the submitted values for re-display
    #[error("Validation failed")]
    Validation {
        errors: FieldErrors,
        form: serde_json::Value,
    },

    /// Uniqueness violation reported by a store, keyed by the offending field
    #[error("Conflict on {field}")]
    Conflict { field: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn login_required() -> Self {
        AppError::Unauthenticated { next: None }
    }

    /// Attach the request path an anonymous actor should return to after login.
    pub fn with_next(self, path: &str) -> Self {
        match self {
            AppError::Unauthenticated { next: None } => AppError::Unauthenticated {
                next: Some(path.to_string()),
            },
            other => other,
        }
    }

    fn login_target(next: Option<&str>) -> String {
        match next {
            Some(path) => format!("{}?next={}", LOGIN_URL, path),
            None => LOGIN_URL.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated { .. } => StatusCode::FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Form errors are re-rendered, not treated as transport failures
            AppError::Validation { .. } => StatusCode::OK,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::Unauthenticated { next } => {
                let target = Self::login_target(next.as_deref());
                HttpResponse::Found()
                    .insert_header((header::LOCATION, target.clone()))
                    .json(serde_json::json!({
                        "redirect": target,
                        "messages": [],
                    }))
            }
            AppError::Validation { errors, form } => HttpResponse::build(status).json(
                serde_json::json!({
                    "form": form,
                    "errors": errors,
                }),
            ),
            AppError::Database(_) | AppError::Internal(_) => {
                // Don't leak internal details
                HttpResponse::build(status).json(serde_json::json!({
                    "error": "Internal server error",
                    "status": status.as_u16(),
                }))
            }
            _ => HttpResponse::build(status).json(serde_json::json!({
                "error": self.to_string(),
                "status": status.as_u16(),
            })),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                let field = match db_err.constraint() {
                    Some("users_username_key") => "username",
                    Some("users_email_key") => "email",
                    _ => "__all__",
                };
                AppError::Conflict {
                    field: field.to_string(),
                }
            }
            // Foreign key violation: the referenced user is gone
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                AppError::NotFound("referenced row".to_string())
            }
            _ => {
                tracing::error!("Database error: {}", err);
                AppError::Database(err.to_string())
            }
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {}", err);
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
