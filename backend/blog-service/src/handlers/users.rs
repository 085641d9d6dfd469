/// User handlers - registration, login, profile page
use super::Outcome;
use crate::error::{AppError, Result};
use crate::middleware::Actor;
use crate::models::{AccountUpdate, LoginRequest, RegisterRequest};
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{web, Either, HttpRequest};
use futures::StreamExt;

type RegisterBody = Either<web::Json<RegisterRequest>, web::Form<RegisterRequest>>;
type LoginBody = Either<web::Json<LoginRequest>, web::Form<LoginRequest>>;

/// GET /register
pub async fn register_form() -> Outcome {
    Outcome::Render(serde_json::json!({
        "form": RegisterRequest::default(),
        "errors": {},
    }))
}

/// POST /register - creates the account, then sends the user to log in
pub async fn register(state: web::Data<AppState>, body: RegisterBody) -> Result<Outcome> {
    let form = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };

    let registered = state.accounts.register(form).await?;
    Ok(Outcome::redirect_with("/login", registered.messages))
}

/// GET /login
pub async fn login_form() -> Outcome {
    Outcome::Render(serde_json::json!({
        "form": LoginRequest::default(),
        "errors": {},
    }))
}

/// POST /login
pub async fn login(state: web::Data<AppState>, body: LoginBody) -> Result<Outcome> {
    let form = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };

    let session = state.accounts.login(form).await?;
    Ok(Outcome::Render(serde_json::to_value(session)?))
}

/// GET /profile
pub async fn profile(req: HttpRequest, state: web::Data<AppState>, actor: Actor) -> Result<Outcome> {
    let profile = state
        .accounts
        .profile(&actor)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::Render(serde_json::json!({
        "title": profile.to_string(),
        "form": { "username": profile.username, "email": profile.email },
        "profile": profile,
    })))
}

/// Fields of the multipart profile form
#[derive(Default)]
struct ProfileSubmission {
    form: AccountUpdate,
    image: Option<Vec<u8>>,
}

/// Read the multipart body. Image bytes beyond `limit` are dropped so the
/// size check downstream still sees an oversized upload.
async fn read_profile_submission(mut payload: Multipart, limit: usize) -> Result<ProfileSubmission> {
    let mut submission = ProfileSubmission::default();

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Multipart read error: {}", e)))?;
            if data.len() <= limit {
                let room = limit + 1 - data.len();
                data.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
        }

        match name.as_str() {
            "username" => submission.form.username = String::from_utf8_lossy(&data).trim().to_string(),
            "email" => submission.form.email = String::from_utf8_lossy(&data).trim().to_string(),
            "image" => submission.image = Some(data),
            _ => {}
        }
    }

    Ok(submission)
}

/// POST /profile - username, email and an optional new image
pub async fn update_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    actor: Actor,
    payload: Multipart,
) -> Result<Outcome> {
    if !actor.is_authenticated() {
        return Err(AppError::login_required().with_next(req.path()));
    }

    let submission = read_profile_submission(payload, state.accounts.max_upload_bytes()).await?;
    let updated = state
        .accounts
        .update_profile(&actor, submission.form, submission.image)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::redirect_with("/profile", updated.messages))
}
