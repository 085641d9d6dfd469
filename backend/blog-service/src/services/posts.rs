/// Post service - listing, detail, and author-only changes
use crate::db::{IdentityStore, PostFilter, PostStore};
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::{check_post_access, decide, stamp_author, Action, Actor, Resource};
use crate::models::{NewPost, Page, PageRequest, Post, PostForm, PostWrite, User};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct PostService {
    posts: Arc<dyn PostStore>,
    identities: Arc<dyn IdentityStore>,
}

fn validate_form(form: &PostForm) -> Result<()> {
    match form.validate() {
        Ok(()) => Ok(()),
        Err(e) => FieldErrors::from(e).into_result(serde_json::to_value(form)?),
    }
}

/// Anonymous actors go to the login page before the post is even looked up.
fn require_login(actor: &Actor) -> Result<()> {
    if actor.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::login_required())
    }
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, identities: Arc<dyn IdentityStore>) -> Self {
        Self { posts, identities }
    }

    /// Home page: every post, newest first
    pub async fn list_home(&self, actor: &Actor, page: PageRequest) -> Result<Page<Post>> {
        decide(Action::ViewList, actor, Resource::Collection).into_result()?;
        self.posts.list_posts(PostFilter::default(), page).await
    }

    /// One user's posts, newest first. Unknown usernames are `NotFound`.
    pub async fn list_by_user(
        &self,
        actor: &Actor,
        username: &str,
        page: PageRequest,
    ) -> Result<(User, Page<Post>)> {
        decide(Action::ViewList, actor, Resource::Collection).into_result()?;

        let author = self
            .identities
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", username)))?;

        let posts = self
            .posts
            .list_posts(PostFilter::by_author(author.id), page)
            .await?;

        Ok((author, posts))
    }

    pub async fn get(&self, actor: &Actor, post_id: Uuid) -> Result<Post> {
        let post = self.posts.get_post(post_id).await?;
        check_post_access(Action::ViewDetail, actor, &post)?;
        Ok(post)
    }

    /// Load a post the actor is about to edit or delete, enforcing ownership.
    /// Also backs the edit form and the delete confirmation page.
    pub async fn get_for_change(&self, actor: &Actor, post_id: Uuid, action: Action) -> Result<Post> {
        require_login(actor)?;
        let post = self.posts.get_post(post_id).await?;
        if let Err(e) = check_post_access(action, actor, &post) {
            tracing::warn!(post_id = %post_id, actor = ?actor.id(), action = ?action, "Post change denied");
            return Err(e);
        }
        Ok(post)
    }

    /// Create a post authored by the actor. Anonymous actors are turned away
    /// before the form is looked at.
    pub async fn create(&self, actor: &Actor, form: PostForm) -> Result<Post> {
        decide(Action::Create, actor, Resource::Collection).into_result()?;
        validate_form(&form)?;

        let author_id = stamp_author(actor)?;
        let new_post = NewPost {
            id: Uuid::new_v4(),
            title: form.title,
            content: form.content,
            author_id,
        };
        let post = match self.posts.create_post(&new_post).await {
            Ok(post) => post,
            // token outlived its account
            Err(AppError::NotFound(_)) => {
                tracing::warn!(user_id = %author_id, "Post author no longer exists");
                return Err(AppError::login_required());
            }
            Err(e) => return Err(e),
        };

        tracing::info!(post_id = %post.id, user_id = %post.author_id, "Post created");
        Ok(post)
    }

    pub async fn update(&self, actor: &Actor, post_id: Uuid, form: PostForm) -> Result<Post> {
        self.get_for_change(actor, post_id, Action::Edit).await?;
        validate_form(&form)?;

        // The author is re-stamped from the actor on every edit, not only on
        // create. Only inert while Edit stays owner-only.
        let write = PostWrite {
            title: form.title,
            content: form.content,
            author_id: stamp_author(actor)?,
        };
        let post = self.posts.update_post(post_id, &write).await?;

        tracing::info!(post_id = %post.id, user_id = %post.author_id, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, actor: &Actor, post_id: Uuid) -> Result<()> {
        self.get_for_change(actor, post_id, Action::Delete).await?;
        self.posts.delete_post(post_id).await?;

        tracing::info!(post_id = %post_id, "Post deleted");
        Ok(())
    }
}
