use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A blog post. `author_id` is fixed at creation; `date_posted` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub date_posted: DateTime<Utc>,
}

/// Title/content submitted by the create and update forms
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(custom(function = "crate::validators::validate_post_title"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub content: String,
}

/// Post to be inserted
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

/// Full set of mutable columns written by an update
#[derive(Debug, Clone)]
pub struct PostWrite {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}
