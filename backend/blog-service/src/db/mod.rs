/// Database access layer
///
/// The service talks to two stores through traits so that handlers and
/// services never depend on a concrete backend:
/// - `IdentityStore`: users and their one-to-one profiles
/// - `PostStore`: blog posts
///
/// `users` and `posts` hold the sqlx/Postgres implementations, `memory` an
/// in-process one with the same atomicity and uniqueness guarantees.
pub mod memory;
pub mod posts;
pub mod users;

pub use memory::MemoryStore;
pub use posts::PgPostStore;
pub use users::PgIdentityStore;

use crate::error::{AppError, Result};
use crate::models::{NewPost, NewUser, Page, PageRequest, Post, PostWrite, Profile, User};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Changes written by a profile-page submission, applied as one unit
#[derive(Debug, Clone)]
pub struct AccountChanges {
    pub username: String,
    pub email: String,
    /// New image reference, if a new image was uploaded
    pub image: Option<String>,
}

/// Optional restriction of a post listing
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub author_id: Option<Uuid>,
}

impl PostFilter {
    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
        }
    }
}

/// Users and profiles
///
/// Uniqueness of usernames and emails is enforced here, inside the write
/// itself, and reported as `AppError::Conflict { field }`.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Insert a user together with its default profile. Either both rows
    /// exist afterwards or neither does.
    async fn create_user(&self, user: &NewUser) -> Result<(User, Profile)>;

    /// Return the user's profile, creating the default one if it is missing.
    async fn create_profile(&self, user_id: Uuid) -> Result<Profile>;

    /// Replace username/email and optionally the image reference atomically.
    async fn update_account(&self, user_id: Uuid, changes: &AccountChanges)
        -> Result<(User, Profile)>;

    async fn update_profile_image(&self, user_id: Uuid, image: &str) -> Result<Profile>;

    /// Remove a user; its profile and posts go with it.
    async fn delete_user(&self, user_id: Uuid) -> Result<()>;
}

/// Blog posts
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first, `PAGE_SIZE` per page. Out-of-range pages are `NotFound`.
    async fn list_posts(&self, filter: PostFilter, page: PageRequest) -> Result<Page<Post>>;

    async fn get_post(&self, post_id: Uuid) -> Result<Post>;

    async fn create_post(&self, post: &NewPost) -> Result<Post>;

    async fn update_post(&self, post_id: Uuid, write: &PostWrite) -> Result<Post>;

    async fn delete_post(&self, post_id: Uuid) -> Result<()>;
}

/// Resolve `page` against `total` rows, rejecting numbers outside the listing.
pub(crate) fn checked_page(page: PageRequest, total: i64) -> Result<i64> {
    let number = page.resolve(total);
    if Page::<Post>::out_of_range(number, total) {
        return Err(AppError::NotFound(format!("Invalid page ({})", number)));
    }
    Ok(number)
}

/// Apply embedded migrations (users, profiles, posts)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
