/// Account service - registration, login and the profile page
use super::media::MediaStorage;
use super::{ACCOUNT_CREATED, ACCOUNT_UPDATED};
use crate::db::{AccountChanges, IdentityStore};
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::{decide, Action, Actor, Resource};
use crate::models::{AccountUpdate, LoginRequest, NewUser, ProfileView, RegisterRequest, User};
use crate::security::{hash_password, verify_password, TokenService};
use crate::validators::{password_problems, PASSWORD_MISMATCH, REQUIRED};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const INVALID_LOGIN: &str = "Please enter a correct username and password.";

/// Outcome of a successful registration. No session is issued.
#[derive(Debug, Clone)]
pub struct Registered {
    pub user: User,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdated {
    pub profile: ProfileView,
    pub messages: Vec<String>,
}

fn conflict_message(field: &str) -> String {
    match field {
        "username" => "A user with that username already exists.".to_string(),
        "email" => "A user with that email already exists.".to_string(),
        _ => "This account conflicts with an existing one.".to_string(),
    }
}

/// Turn a store-level uniqueness violation into a form re-render.
fn conflict_to_validation(err: AppError, form: serde_json::Value) -> AppError {
    match err {
        AppError::Conflict { field } => {
            let key = match field.as_str() {
                "username" | "email" => field.as_str(),
                _ => FieldErrors::NON_FIELD,
            };
            AppError::Validation {
                errors: FieldErrors::single(key, conflict_message(&field)),
                form,
            }
        }
        other => other,
    }
}

pub struct AccountService {
    identities: Arc<dyn IdentityStore>,
    tokens: Arc<TokenService>,
    media: MediaStorage,
}

impl AccountService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        tokens: Arc<TokenService>,
        media: MediaStorage,
    ) -> Self {
        Self {
            identities,
            tokens,
            media,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.media.max_upload_bytes()
    }

    /// Uniqueness pre-check for nicer messages. The store still enforces it.
    async fn taken_fields(
        &self,
        username: &str,
        email: &str,
        except: Option<Uuid>,
    ) -> Result<FieldErrors> {
        let mut errors = FieldErrors::new();
        let is_other = |user: &User| Some(user.id) != except;

        if let Some(user) = self.identities.find_user_by_username(username).await? {
            if is_other(&user) {
                errors.add("username", conflict_message("username"));
            }
        }
        if let Some(user) = self.identities.find_user_by_email(email).await? {
            if is_other(&user) {
                errors.add("email", conflict_message("email"));
            }
        }

        Ok(errors)
    }

    /// Create a user and its profile.
    ///
    /// On any failure nothing is written and the submitted fields (minus
    /// passwords) come back with per-field messages.
    pub async fn register(&self, form: RegisterRequest) -> Result<Registered> {
        let form_data = serde_json::to_value(&form)?;

        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        if form.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if form.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if form.password1 != form.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        } else {
            for problem in password_problems(&form.password2, &form.username, &form.email) {
                errors.add("password2", problem);
            }
        }

        if !errors.has("username") && !errors.has("email") {
            errors.merge(self.taken_fields(&form.username, &form.email, None).await?);
        }

        if let Err(e) = errors.into_result(form_data.clone()) {
            tracing::info!(username = %form.username, "Registration rejected");
            return Err(e);
        }

        let new_user = NewUser {
            id: Uuid::new_v4(),
            username: form.username.clone(),
            email: form.email.clone(),
            password_hash: hash_password(&form.password1)?,
        };

        // Two concurrent registrations can both pass the pre-check; the store
        // lets only one through.
        let (user, profile) = self
            .identities
            .create_user(&new_user)
            .await
            .map_err(|e| conflict_to_validation(e, form_data))?;

        tracing::info!(user_id = %user.id, username = %user.username, image = %profile.image, "Account created");

        Ok(Registered {
            user,
            messages: vec![ACCOUNT_CREATED.to_string()],
        })
    }

    pub async fn login(&self, form: LoginRequest) -> Result<LoginResponse> {
        let form_data = serde_json::to_value(&form)?;

        let mut errors = FieldErrors::new();
        if form.username.is_empty() {
            errors.add("username", REQUIRED);
        }
        if form.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(form_data.clone())?;

        let user = match self.identities.find_user_by_username(&form.username).await? {
            Some(user) if verify_password(&form.password, &user.password_hash)? => user,
            _ => {
                tracing::info!(username = %form.username, "Login failed");
                return Err(AppError::Validation {
                    errors: FieldErrors::single(FieldErrors::NON_FIELD, INVALID_LOGIN),
                    form: form_data,
                });
            }
        };

        let access_token = self.tokens.issue(user.id, &user.username)?;
        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_secs(),
            user,
        })
    }

    /// Load the actor's own user and profile, creating the profile if missing.
    async fn own_profile(&self, actor: &Actor, action: Action) -> Result<ProfileView> {
        let user_id = actor.id().ok_or_else(AppError::login_required)?;
        let user = self
            .identities
            .find_user_by_id(user_id)
            .await?
            // token outlived its account
            .ok_or_else(AppError::login_required)?;

        let profile = self.identities.create_profile(user.id).await?;
        decide(action, actor, Resource::Profile(&profile)).into_result()?;

        Ok(ProfileView {
            user_id: user.id,
            username: user.username,
            email: user.email,
            image: profile.image,
        })
    }

    pub async fn profile(&self, actor: &Actor) -> Result<ProfileView> {
        self.own_profile(actor, Action::ViewDetail).await
    }

    /// Apply a profile-page submission: username, email and an optional new
    /// image. All fields are validated before anything is written; a rejected
    /// image leaves the stored reference untouched.
    pub async fn update_profile(
        &self,
        actor: &Actor,
        form: AccountUpdate,
        image: Option<Vec<u8>>,
    ) -> Result<ProfileUpdated> {
        let current = self.own_profile(actor, Action::Edit).await?;
        let form_data = serde_json::to_value(&form)?;

        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };
        if !errors.has("username") && !errors.has("email") {
            errors.merge(
                self.taken_fields(&form.username, &form.email, Some(current.user_id))
                    .await?,
            );
        }

        let upload = match image.filter(|bytes| !bytes.is_empty()) {
            None => None,
            Some(bytes) => match self.media.validate_upload(bytes).await {
                Ok(valid) => Some(valid),
                Err(e) => match e.field_message() {
                    Some(message) => {
                        tracing::info!(user_id = %current.user_id, "Rejected profile image: {}", e);
                        errors.add("image", message);
                        None
                    }
                    None => return Err(AppError::Internal(e.to_string())),
                },
            },
        };

        errors.into_result(form_data.clone())?;

        let image = match upload {
            Some(valid) => Some(
                self.media
                    .save_profile_image(valid)
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            ),
            None => None,
        };

        let changes = AccountChanges {
            username: form.username,
            email: form.email,
            image: image.clone(),
        };
        let (user, profile) = match self.identities.update_account(current.user_id, &changes).await
        {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(reference) = &image {
                    self.media.discard(reference).await;
                }
                return Err(conflict_to_validation(e, form_data));
            }
        };

        tracing::info!(user_id = %user.id, image = %profile.image, "Profile updated");

        Ok(ProfileUpdated {
            profile: ProfileView {
                user_id: user.id,
                username: user.username,
                email: user.email,
                image: profile.image,
            },
            messages: vec![ACCOUNT_UPDATED.to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> (AccountService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let service = AccountService::new(
            store,
            Arc::new(TokenService::new("test-secret", 3600)),
            MediaStorage::new(dir.path(), 1024 * 1024),
        );
        (service, dir)
    }

    fn registration(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password1: "newpassword123".into(),
            password2: "newpassword123".into(),
        }
    }

    #[tokio::test]
    async fn register_creates_user_and_profile_with_one_message() {
        let store = Arc::new(MemoryStore::new());
        let (service, _dir) = service(store.clone());

        let registered = service
            .register(registration("newuser", "newuser@example.com"))
            .await
            .unwrap();

        assert_eq!(registered.messages, vec![ACCOUNT_CREATED.to_string()]);
        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.profile_count().await, 1);
        assert_ne!(registered.user.password_hash, "newpassword123");
    }

    #[tokio::test]
    async fn register_rejects_invalid_email_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let (service, _dir) = service(store.clone());

        let err = service
            .register(registration("newuser", "invalidemail"))
            .await
            .unwrap_err();

        match err {
            AppError::Validation { errors, form } => {
                assert_eq!(
                    errors.get("email"),
                    Some(&["Enter a valid email address.".to_string()][..])
                );
                assert_eq!(form["email"], "invalidemail");
                assert!(form.get("password1").is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn register_reports_mismatch_and_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let (service, _dir) = service(store.clone());
        service
            .register(registration("newuser", "newuser@example.com"))
            .await
            .unwrap();

        let mut form = registration("newuser", "newuser@example.com");
        form.password2 = "somethingelse1".into();
        let err = service.register(form).await.unwrap_err();
        match err {
            AppError::Validation { errors, .. } => {
                assert!(errors.has("username"));
                assert!(errors.has("email"));
                assert_eq!(
                    errors.get("password2"),
                    Some(&[PASSWORD_MISMATCH.to_string()][..])
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn login_issues_token_only_for_correct_password() {
        let store = Arc::new(MemoryStore::new());
        let (service, _dir) = service(store);
        let registered = service
            .register(registration("newuser", "newuser@example.com"))
            .await
            .unwrap();

        let ok = service
            .login(LoginRequest {
                username: "newuser".into(),
                password: "newpassword123".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user.id, registered.user.id);
        assert_eq!(ok.token_type, "Bearer");

        let err = service
            .login(LoginRequest {
                username: "newuser".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref errors, .. } if errors.has("__all__")));
    }

    #[tokio::test]
    async fn profile_requires_login() {
        let (service, _dir) = service(Arc::new(MemoryStore::new()));
        let err = service.profile(&Actor::Anonymous).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn invalid_image_leaves_profile_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let (service, _dir) = service(store.clone());
        let registered = service
            .register(registration("newuser", "newuser@example.com"))
            .await
            .unwrap();
        let actor = Actor::user(registered.user.id, "newuser");

        let err = service
            .update_profile(
                &actor,
                AccountUpdate {
                    username: "renamed".into(),
                    email: "newuser@example.com".into(),
                },
                Some(b"not an image".to_vec()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref errors, .. } if errors.has("image")));
        let profile = service.profile(&actor).await.unwrap();
        assert_eq!(profile.image, "default.jpg");
        assert_eq!(profile.username, "newuser");
    }

    #[tokio::test]
    async fn account_update_changes_username_and_email() {
        let store = Arc::new(MemoryStore::new());
        let (service, _dir) = service(store);
        let registered = service
            .register(registration("newuser", "newuser@example.com"))
            .await
            .unwrap();
        let actor = Actor::user(registered.user.id, "newuser");

        let updated = service
            .update_profile(
                &actor,
                AccountUpdate {
                    username: "renamed".into(),
                    email: "renamed@example.com".into(),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.profile.username, "renamed");
        assert_eq!(updated.profile.email, "renamed@example.com");
        assert_eq!(updated.messages, vec![ACCOUNT_UPDATED.to_string()]);
    }
}
