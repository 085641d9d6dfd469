mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use blog_service::db::{IdentityStore, PostStore};
use blog_service::models::{NewPost, Post};
use common::TestContext;
use serde_json::{json, Value};
use uuid::Uuid;

async fn seed_post(ctx: &TestContext, author_id: Uuid, title: &str) -> Post {
    ctx.store
        .create_post(&NewPost {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: format!("{} content", title),
            author_id,
        })
        .await
        .expect("seed post")
}

fn titles(body: &Value) -> Vec<String> {
    body["posts"]["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|p| p["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[actix_web::test]
async fn home_lists_newest_first_eight_per_page() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    for i in 0..10 {
        seed_post(&ctx, author.id, &format!("Post {}", i)).await;
    }
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let first = titles(&body);
    assert_eq!(first.len(), 8);
    assert_eq!(first[0], "Post 9");
    assert_eq!(first[7], "Post 2");
    assert_eq!(body["posts"]["has_next"], true);

    let req = test::TestRequest::get().uri("/?page=2").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&body), vec!["Post 1", "Post 0"]);

    let req = test::TestRequest::get().uri("/?page=last").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["posts"]["number"], 2);
}

#[actix_web::test]
async fn home_page_bounds() {
    let ctx = TestContext::new();
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    // An empty listing still has page 1
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for uri in ["/?page=2", "/?page=0", "/?page=abc"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_web::test]
async fn user_posts_only_lists_that_author() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    let bob = ctx.create_user("bob").await;
    for i in 0..9 {
        seed_post(&ctx, alice.id, &format!("Alice {}", i)).await;
        seed_post(&ctx, bob.id, &format!("Bob {}", i)).await;
    }
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::get().uri("/user/alice").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let first = titles(&body);
    assert_eq!(first.len(), 8);
    assert_eq!(first[0], "Alice 8");
    assert_eq!(first[7], "Alice 1");
    assert!(first.iter().all(|t| t.starts_with("Alice")));
    assert_eq!(body["author"]["username"], "alice");
    assert_eq!(body["posts"]["has_next"], true);

    let req = test::TestRequest::get().uri("/user/alice?page=2").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&body), vec!["Alice 0"]);

    let req = test::TestRequest::get().uri("/user/alice?page=3").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/user/nobody").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn post_detail_is_public() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::get()
        .uri(&format!("/post/{}", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["post"]["title"], "Test Post");
    assert_eq!(body["post"]["author_id"], author.id.to_string());

    let req = test::TestRequest::get()
        .uri(&format!("/post/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/post/not-a-uuid").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn create_post_as_logged_in_user() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "title": "New Post", "content": "New content" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(location.starts_with("/post/"));

    let post_id: Uuid = location.trim_start_matches("/post/").parse().unwrap();
    let post = ctx.store.get_post(post_id).await.unwrap();
    assert_eq!(post.title, "New Post");
    assert_eq!(post.author_id, author.id);
}

#[actix_web::test]
async fn create_post_accepts_form_encoding() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header(ctx.bearer(&author))
        .set_form([("title", "Form Post"), ("content", "From a form")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(ctx.store.post_count().await, 1);
}

#[actix_web::test]
async fn anonymous_create_redirects_to_login() {
    let ctx = TestContext::new();
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .set_json(json!({ "title": "New Post", "content": "New content" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/login?next=/post/new"
    );
    assert_eq!(ctx.store.post_count().await, 0);

    let req = test::TestRequest::get().uri("/post/new").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn anonymous_create_without_form_body_redirects_to_login() {
    let ctx = TestContext::new();
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post().uri("/post/new").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/login?next=/post/new"
    );

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("hello")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(ctx.store.post_count().await, 0);
}

#[actix_web::test]
async fn logged_in_create_without_form_body_is_bad_request() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header(ctx.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.store.post_count().await, 0);
}

#[actix_web::test]
async fn create_with_token_of_deleted_account_redirects_to_login() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let auth = ctx.bearer(&author);
    ctx.store.delete_user(author.id).await.unwrap();
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header(auth)
        .set_json(json!({ "title": "New Post", "content": "New content" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "/login?next=/post/new"
    );
    assert_eq!(ctx.store.post_count().await, 0);
}

#[actix_web::test]
async fn invalid_post_form_is_rerendered() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "title": "", "content": "Body" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["title"][0], "This field is required.");
    assert_eq!(body["form"]["content"], "Body");
    assert_eq!(ctx.store.post_count().await, 0);
}

#[actix_web::test]
async fn author_can_update_post() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::get()
        .uri(&format!("/post/{}/update", post.id))
        .insert_header(ctx.bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["form"]["title"], "Test Post");

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/update", post.id))
        .insert_header(ctx.bearer(&author))
        .set_json(json!({ "title": "Updated Post", "content": "Updated content" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
        format!("/post/{}", post.id)
    );

    let updated = ctx.store.get_post(post.id).await.unwrap();
    assert_eq!(updated.title, "Updated Post");
    assert_eq!(updated.content, "Updated content");
    assert_eq!(updated.author_id, author.id);
    assert_eq!(updated.date_posted, post.date_posted);
}

#[actix_web::test]
async fn non_author_update_is_forbidden() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let other = ctx.create_user("otheruser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/update", post.id))
        .insert_header(ctx.bearer(&other))
        .set_json(json!({ "title": "Hijacked", "content": "Hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get(header::LOCATION).is_none());

    assert_eq!(ctx.store.get_post(post.id).await.unwrap(), post);
}

#[actix_web::test]
async fn non_author_update_without_form_body_is_forbidden() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let other = ctx.create_user("otheruser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/update", post.id))
        .insert_header(ctx.bearer(&other))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/update", post.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    assert_eq!(ctx.store.get_post(post.id).await.unwrap(), post);
}

#[actix_web::test]
async fn anonymous_update_redirects_to_login() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let path = format!("/post/{}/update", post.id);
    let req = test::TestRequest::post()
        .uri(&path)
        .set_json(json!({ "title": "Anon", "content": "Anon" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
        format!("/login?next={}", path)
    );
    assert_eq!(ctx.store.get_post(post.id).await.unwrap(), post);
}

#[actix_web::test]
async fn author_can_delete_post() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::get()
        .uri(&format!("/post/{}/delete", post.id))
        .insert_header(ctx.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/delete", post.id))
        .insert_header(ctx.bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
    assert_eq!(ctx.store.post_count().await, 0);
}

#[actix_web::test]
async fn non_author_delete_is_forbidden() {
    let ctx = TestContext::new();
    let author = ctx.create_user("testuser").await;
    let other = ctx.create_user("otheruser").await;
    let post = seed_post(&ctx, author.id, "Test Post").await;
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/delete", post.id))
        .insert_header(ctx.bearer(&other))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.store.post_count().await, 1);
}

#[actix_web::test]
async fn tampered_token_is_treated_as_anonymous() {
    let ctx = TestContext::new();
    let app = test::init_service(blog_service::build_app(ctx.state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/post/new")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .set_json(json!({ "title": "New Post", "content": "New content" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(ctx.store.post_count().await, 0);
}
