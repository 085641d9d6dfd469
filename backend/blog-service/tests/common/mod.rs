//! Shared fixtures for blog-service integration tests
//!
//! Everything runs over the in-memory store with a temporary media root, so
//! no database is needed.
#![allow(dead_code)]

use blog_service::db::{IdentityStore, MemoryStore};
use blog_service::models::{NewUser, User};
use blog_service::security::TokenService;
use blog_service::services::MediaStorage;
use blog_service::AppState;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub media_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let media_dir = tempfile::tempdir().expect("create media dir");
        let state = AppState::in_memory(
            store.clone(),
            Arc::new(TokenService::new(TEST_SECRET, 3600)),
            MediaStorage::new(media_dir.path(), 1024 * 1024),
        );

        Self {
            store,
            state,
            media_dir,
        }
    }

    /// Insert a user directly. The password hash is a placeholder, so these
    /// users authenticate with [`TestContext::bearer`] rather than `/login`.
    pub async fn create_user(&self, username: &str) -> User {
        let (user, _) = self
            .store
            .create_user(&NewUser {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .expect("create user");
        user
    }

    /// `Authorization` header value for `user`
    pub fn bearer(&self, user: &User) -> (String, String) {
        let token = self
            .state
            .tokens
            .issue(user.id, &user.username)
            .expect("issue token");
        ("Authorization".to_string(), format!("Bearer {}", token))
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([10u8, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub const BOUNDARY: &str = "----blogtestboundary";

/// Build a multipart/form-data body. Returns the content type and the body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((name, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
