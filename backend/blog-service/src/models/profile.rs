use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Image reference every profile starts with.
pub const DEFAULT_PROFILE_IMAGE: &str = "default.jpg";

/// One-to-one companion record of a [`User`](super::User)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub image: String,
}

impl Profile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            image: DEFAULT_PROFILE_IMAGE.to_string(),
        }
    }
}

/// What the profile page shows
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub image: String,
}

impl fmt::Display for ProfileView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Profile", self.username)
    }
}
