/// Static pages
use super::Outcome;
use actix_web::HttpResponse;

pub async fn about() -> Outcome {
    Outcome::Render(serde_json::json!({ "title": "About" }))
}

/// Liveness probe
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "blog-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
