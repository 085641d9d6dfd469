/// HTTP request handlers
///
/// Handlers extract the [`Actor`](crate::middleware::Actor), call a service,
/// and turn the result into an [`Outcome`]: a render with data, or a redirect
/// carrying flash messages. Errors go through `AppError`'s `ResponseError`.
pub mod pages;
pub mod posts;
pub mod users;

use crate::error::{AppError, Result};
use crate::models::PageRequest;
use actix_web::body::BoxBody;
use actix_web::{http::header, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

/// What a successful request resolves to
#[derive(Debug)]
pub enum Outcome {
    Render(serde_json::Value),
    Redirect {
        target: String,
        messages: Vec<String>,
    },
}

impl Outcome {
    pub fn redirect(target: impl Into<String>) -> Self {
        Outcome::Redirect {
            target: target.into(),
            messages: Vec::new(),
        }
    }

    pub fn redirect_with(target: impl Into<String>, messages: Vec<String>) -> Self {
        Outcome::Redirect {
            target: target.into(),
            messages,
        }
    }
}

impl Responder for Outcome {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        match self {
            Outcome::Render(data) => HttpResponse::Ok().json(data),
            Outcome::Redirect { target, messages } => HttpResponse::Found()
                .insert_header((header::LOCATION, target.clone()))
                .json(serde_json::json!({
                    "redirect": target,
                    "messages": messages,
                })),
        }
    }
}

/// `?page=` query parameter
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Anything other than a number or `last` is a missing page.
    pub fn request(&self) -> Result<PageRequest> {
        PageRequest::parse(self.page.as_deref())
            .ok_or_else(|| AppError::NotFound("Invalid page".to_string()))
    }
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(posts::home))
        .route("/about", web::get().to(pages::about))
        .route("/health", web::get().to(pages::health))
        .route("/user/{username}", web::get().to(posts::user_posts))
        .service(
            web::resource("/post/new")
                .route(web::get().to(posts::new_form))
                .route(web::post().to(posts::create)),
        )
        .route("/post/{id}", web::get().to(posts::detail))
        .service(
            web::resource("/post/{id}/update")
                .route(web::get().to(posts::edit_form))
                .route(web::post().to(posts::update)),
        )
        .service(
            web::resource("/post/{id}/delete")
                .route(web::get().to(posts::confirm_delete))
                .route(web::post().to(posts::delete)),
        )
        .service(
            web::resource("/register")
                .route(web::get().to(users::register_form))
                .route(web::post().to(users::register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(users::login_form))
                .route(web::post().to(users::login)),
        )
        .service(
            web::resource("/profile")
                .route(web::get().to(users::profile))
                .route(web::post().to(users::update_profile)),
        );
}
