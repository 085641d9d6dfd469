/// HTTP middleware utilities for blog-service
///
/// `SessionMiddleware` resolves the Bearer token (if any) into an [`Actor`]
/// stored in request extensions. Handlers take `Actor` as an extractor, so the
/// requesting identity is always an explicit argument and never ambient state.
pub mod permissions;

pub use permissions::*;

use crate::security::TokenService;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{http::header, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// A logged-in identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

/// Whoever is performing the request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(AuthenticatedUser),
}

impl Actor {
    pub fn user(id: Uuid, username: impl Into<String>) -> Self {
        Actor::User(AuthenticatedUser {
            id,
            username: username.into(),
        })
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Actor::Anonymous => None,
            Actor::User(user) => Some(user.id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    /// Resolve an `Authorization` header value. Anything unusable is anonymous.
    pub fn from_authorization(value: Option<&str>, tokens: &TokenService) -> Self {
        let token = match value.and_then(|v| v.strip_prefix("Bearer ")) {
            Some(token) => token.trim(),
            None => return Actor::Anonymous,
        };

        let claims = match tokens.validate(token) {
            Ok(claims) => claims,
            Err(_) => return Actor::Anonymous,
        };

        match claims.user_id() {
            Ok(id) => Actor::user(id, claims.username),
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                Actor::Anonymous
            }
        }
    }
}

/// Actix middleware that turns a Bearer token into an [`Actor`].
///
/// Unlike a hard auth guard it never rejects a request; the policy decides
/// later what an anonymous actor may do.
pub struct SessionMiddleware {
    tokens: Arc<TokenService>,
}

impl SessionMiddleware {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let actor = {
            let value = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok());
            Actor::from_authorization(value, &self.tokens)
        };
        req.extensions_mut().insert(actor);

        Box::pin(async move { service.call(req).await })
    }
}

impl FromRequest for Actor {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<Actor>()
            .cloned()
            .unwrap_or_default()))
    }
}
