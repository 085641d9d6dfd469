/// Blog Service Library
///
/// A small blog: users register and log in, write posts, and manage a
/// profile with an avatar image. Reads are public; changing a post is
/// reserved to its author.
///
/// # Modules
///
/// - `config`: environment-based configuration
/// - `db`: store traits with Postgres and in-memory implementations
/// - `error`: error kinds and their HTTP mapping
/// - `handlers`: HTTP request handlers and routes
/// - `middleware`: session extraction and the authorization policy
/// - `models`: data structures and forms
/// - `security`: password hashing and session tokens
/// - `services`: registration, profiles, posts, media
/// - `validators`: form field rules
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use db::{IdentityStore, MemoryStore, PostStore};
use middleware::SessionMiddleware;
use security::TokenService;
use services::{AccountService, MediaStorage, PostService};
use std::sync::Arc;

/// Shared per-app state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        posts: Arc<dyn PostStore>,
        tokens: Arc<TokenService>,
        media: MediaStorage,
    ) -> Self {
        Self {
            posts: Arc::new(PostService::new(posts, identities.clone())),
            accounts: Arc::new(AccountService::new(identities, tokens.clone(), media)),
            tokens,
        }
    }

    /// Both stores backed by one in-process [`MemoryStore`]
    pub fn in_memory(store: Arc<MemoryStore>, tokens: Arc<TokenService>, media: MediaStorage) -> Self {
        Self::new(store.clone(), store, tokens, media)
    }
}

/// The application with state, session resolution and all routes.
/// The binary adds CORS and request tracing on top.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let tokens = state.tokens.clone();
    App::new()
        .app_data(web::Data::new(state))
        .wrap(SessionMiddleware::new(tokens))
        .configure(handlers::configure)
}
