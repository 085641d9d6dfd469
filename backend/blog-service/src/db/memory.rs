/// In-process store implementing both `IdentityStore` and `PostStore`
///
/// All state sits behind one lock, so paired user/profile creation and the
/// uniqueness checks happen in a single critical section.
use super::{checked_page, AccountChanges, IdentityStore, PostFilter, PostStore};
use crate::error::{AppError, Result};
use crate::models::{NewPost, NewUser, Page, PageRequest, Post, PostWrite, Profile, User, PAGE_SIZE};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    posts: HashMap<Uuid, Post>,
    last_posted: Option<DateTime<Utc>>,
}

impl Inner {
    /// Field that would collide with another user, if any.
    fn conflicting_field(&self, user_id: Uuid, username: &str, email: &str) -> Option<&'static str> {
        let others = self.users.values().filter(|u| u.id != user_id);
        for other in others {
            if other.username == username {
                return Some("username");
            }
            if other.email == email {
                return Some("email");
            }
        }
        None
    }

    /// Strictly increasing timestamps keep newest-first ordering total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_posted {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_posted = Some(stamp);
        stamp
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn profile_count(&self) -> usize {
        self.inner.read().await.profiles.len()
    }

    pub async fn post_count(&self) -> usize {
        self.inner.read().await.posts.len()
    }

    /// Find the profile without creating one
    pub async fn find_profile(&self, user_id: Uuid) -> Option<Profile> {
        self.inner.read().await.profiles.get(&user_id).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<(User, Profile)> {
        let mut inner = self.inner.write().await;

        if let Some(field) = inner.conflicting_field(new_user.id, &new_user.username, &new_user.email)
        {
            return Err(AppError::Conflict {
                field: field.to_string(),
            });
        }

        let user = User {
            id: new_user.id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            date_joined: Utc::now(),
        };
        let profile = Profile::new(user.id);

        inner.users.insert(user.id, user.clone());
        inner.profiles.insert(user.id, profile.clone());

        Ok((user, profile))
    }

    async fn create_profile(&self, user_id: Uuid) -> Result<Profile> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }

        Ok(inner
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id))
            .clone())
    }

    async fn update_account(
        &self,
        user_id: Uuid,
        changes: &AccountChanges,
    ) -> Result<(User, Profile)> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        if let Some(field) = inner.conflicting_field(user_id, &changes.username, &changes.email) {
            return Err(AppError::Conflict {
                field: field.to_string(),
            });
        }

        let user = match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.username = changes.username.clone();
                user.email = changes.email.clone();
                user.clone()
            }
            None => return Err(AppError::NotFound(format!("user {}", user_id))),
        };

        let profile = inner
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id));
        if let Some(image) = &changes.image {
            profile.image = image.clone();
        }
        let profile = profile.clone();

        Ok((user, profile))
    }

    async fn update_profile_image(&self, user_id: Uuid, image: &str) -> Result<Profile> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }

        let profile = inner
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id));
        profile.image = image.to_string();

        Ok(profile.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&user_id).is_none() {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        inner.profiles.remove(&user_id);
        inner.posts.retain(|_, post| post.author_id != user_id);

        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self, filter: PostFilter, page: PageRequest) -> Result<Page<Post>> {
        let inner = self.inner.read().await;

        let mut posts: Vec<&Post> = inner
            .posts
            .values()
            .filter(|p| filter.author_id.map_or(true, |author| p.author_id == author))
            .collect();
        posts.sort_by(|a, b| b.date_posted.cmp(&a.date_posted));

        let total = posts.len() as i64;
        let number = checked_page(page, total)?;

        let items = posts
            .into_iter()
            .skip(PageRequest::offset(number) as usize)
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, number, total))
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        self.inner
            .read()
            .await
            .posts
            .get(&post_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    async fn create_post(&self, new_post: &NewPost) -> Result<Post> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&new_post.author_id) {
            return Err(AppError::NotFound("referenced row".to_string()));
        }

        let post = Post {
            id: new_post.id,
            title: new_post.title.clone(),
            content: new_post.content.clone(),
            author_id: new_post.author_id,
            date_posted: inner.next_timestamp(),
        };
        inner.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn update_post(&self, post_id: Uuid, write: &PostWrite) -> Result<Post> {
        let mut inner = self.inner.write().await;
        let post = inner
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        post.title = write.title.clone();
        post.content = write.content.clone();
        post.author_id = write.author_id;

        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .posts
            .remove(&post_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_post(author_id: Uuid, title: &str) -> NewPost {
        NewPost {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "content".to_string(),
            author_id,
        }
    }

    #[tokio::test]
    async fn create_user_pairs_profile() {
        let store = MemoryStore::new();
        let (user, profile) = store
            .create_user(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.image, "default.jpg");
        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts_without_writing() {
        let store = MemoryStore::new();
        store
            .create_user(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = store
            .create_user(&new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field } if field == "username"));

        let err = store
            .create_user(&new_user("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field } if field == "email"));

        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_admit_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_user(&new_user("racer", &format!("racer{}@example.com", i)))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn create_profile_is_get_or_create() {
        let store = MemoryStore::new();
        let (user, _) = store
            .create_user(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        store.update_profile_image(user.id, "profile_pics/a.png").await.unwrap();

        let profile = store.create_profile(user.id).await.unwrap();
        assert_eq!(profile.image, "profile_pics/a.png");

        let missing = store.create_profile(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paged() {
        let store = MemoryStore::new();
        let (user, _) = store
            .create_user(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        for i in 0..10 {
            store
                .create_post(&new_post(user.id, &format!("post {}", i)))
                .await
                .unwrap();
        }

        let first = store
            .list_posts(PostFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(first.items.len(), 8);
        assert_eq!(first.items[0].title, "post 9");
        assert!(first
            .items
            .windows(2)
            .all(|w| w[0].date_posted > w[1].date_posted));

        let last = store
            .list_posts(PostFilter::default(), PageRequest::Last)
            .await
            .unwrap();
        assert_eq!(last.number, 2);
        assert_eq!(last.items.len(), 2);
        assert_eq!(last.items[1].title, "post 0");

        let beyond = store
            .list_posts(PostFilter::default(), PageRequest::Number(3))
            .await;
        assert!(matches!(beyond, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_user_cascades() {
        let store = MemoryStore::new();
        let (alice, _) = store
            .create_user(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        let (bob, _) = store
            .create_user(&new_user("bob", "bob@example.com"))
            .await
            .unwrap();
        store.create_post(&new_post(alice.id, "a")).await.unwrap();
        store.create_post(&new_post(bob.id, "b")).await.unwrap();

        store.delete_user(alice.id).await.unwrap();

        assert!(store.find_profile(alice.id).await.is_none());
        assert_eq!(store.post_count().await, 1);
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn update_account_rejects_taken_username() {
        let store = MemoryStore::new();
        let (alice, _) = store
            .create_user(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        store
            .create_user(&new_user("bob", "bob@example.com"))
            .await
            .unwrap();

        let changes = AccountChanges {
            username: "bob".to_string(),
            email: "alice@example.com".to_string(),
            image: Some("profile_pics/new.png".to_string()),
        };
        let err = store.update_account(alice.id, &changes).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field } if field == "username"));

        let unchanged = store.find_user_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(unchanged.username, "alice");
        assert_eq!(store.find_profile(alice.id).await.unwrap().image, "default.jpg");
    }
}
