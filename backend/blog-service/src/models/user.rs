use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// User model - core identity entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

/// Account to be inserted together with its profile
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Registration form
///
/// `password2` is the confirmation and must equal `password1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(custom(function = "crate::validators::validate_username_shape_validator"))]
    pub username: String,
    #[serde(default)]
    #[validate(custom(function = "crate::validators::validate_email_shape_validator"))]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password1: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
}

/// Login form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

/// Username/email change submitted from the profile page
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AccountUpdate {
    #[validate(custom(function = "crate::validators::validate_username_shape_validator"))]
    pub username: String,
    #[validate(custom(function = "crate::validators::validate_email_shape_validator"))]
    pub email: String,
}
