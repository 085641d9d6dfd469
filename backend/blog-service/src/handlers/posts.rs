/// Post handlers - listing, detail, create, update, delete
use super::{Outcome, PageQuery};
use crate::error::{AppError, Result};
use crate::middleware::{decide, Action, Actor, Resource};
use crate::models::PostForm;
use crate::AppState;
use actix_web::{web, Either, HttpRequest};
use uuid::Uuid;

/// Post form body, JSON or url-encoded. Extraction never fails the request;
/// an unreadable body only surfaces once the actor has been authorized.
type PostBody = Option<Either<web::Json<PostForm>, web::Form<PostForm>>>;

fn into_form(body: PostBody) -> Result<PostForm> {
    match body {
        Some(Either::Left(json)) => Ok(json.into_inner()),
        Some(Either::Right(form)) => Ok(form.into_inner()),
        None => Err(AppError::BadRequest(
            "Expected a JSON or url-encoded post form".to_string(),
        )),
    }
}

/// GET / - every post, newest first
pub async fn home(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<PageQuery>,
) -> Result<Outcome> {
    let page = state.posts.list_home(&actor, query.request()?).await?;
    Ok(Outcome::Render(serde_json::json!({ "posts": page })))
}

/// GET /user/{username}
pub async fn user_posts(
    state: web::Data<AppState>,
    actor: Actor,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<Outcome> {
    let (author, page) = state
        .posts
        .list_by_user(&actor, &username, query.request()?)
        .await?;

    Ok(Outcome::Render(serde_json::json!({
        "author": { "id": author.id, "username": author.username },
        "posts": page,
    })))
}

/// GET /post/{id}
pub async fn detail(
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<Outcome> {
    let post = state.posts.get(&actor, *post_id).await?;
    Ok(Outcome::Render(serde_json::json!({ "post": post })))
}

/// GET /post/new - empty form, login required
pub async fn new_form(req: HttpRequest, actor: Actor) -> Result<Outcome> {
    decide(Action::Create, &actor, Resource::Collection)
        .into_result()
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::Render(serde_json::json!({
        "form": PostForm::default(),
        "errors": {},
    })))
}

/// POST /post/new
pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    actor: Actor,
    body: PostBody,
) -> Result<Outcome> {
    decide(Action::Create, &actor, Resource::Collection)
        .into_result()
        .map_err(|e| e.with_next(req.path()))?;

    let post = state
        .posts
        .create(&actor, into_form(body)?)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::redirect(format!("/post/{}", post.id)))
}

/// GET /post/{id}/update - form prefilled with the post
pub async fn edit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<Outcome> {
    let post = state
        .posts
        .get_for_change(&actor, *post_id, Action::Edit)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::Render(serde_json::json!({
        "form": PostForm { title: post.title, content: post.content },
        "errors": {},
    })))
}

/// POST /post/{id}/update
pub async fn update(
    req: HttpRequest,
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<Uuid>,
    body: PostBody,
) -> Result<Outcome> {
    state
        .posts
        .get_for_change(&actor, *post_id, Action::Edit)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    let post = state
        .posts
        .update(&actor, *post_id, into_form(body)?)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::redirect(format!("/post/{}", post.id)))
}

/// GET /post/{id}/delete - confirmation page
pub async fn confirm_delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<Outcome> {
    let post = state
        .posts
        .get_for_change(&actor, *post_id, Action::Delete)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::Render(serde_json::json!({ "post": post })))
}

/// POST /post/{id}/delete
pub async fn delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    actor: Actor,
    post_id: web::Path<Uuid>,
) -> Result<Outcome> {
    state
        .posts
        .delete(&actor, *post_id)
        .await
        .map_err(|e| e.with_next(req.path()))?;

    Ok(Outcome::redirect("/"))
}
