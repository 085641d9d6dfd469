/// Post database operations
use super::{checked_page, PostFilter, PostStore};
use crate::error::{AppError, Result};
use crate::models::{NewPost, Page, PageRequest, Post, PostWrite, PAGE_SIZE};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed post store
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn list_posts(&self, filter: PostFilter, page: PageRequest) -> Result<Page<Post>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE ($1::uuid IS NULL OR author_id = $1)",
        )
        .bind(filter.author_id)
        .fetch_one(&self.pool)
        .await?;

        let number = checked_page(page, total)?;

        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, author_id, date_posted
            FROM posts
            WHERE ($1::uuid IS NULL OR author_id = $1)
            ORDER BY date_posted DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.author_id)
        .bind(PAGE_SIZE)
        .bind(PageRequest::offset(number))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(posts, number, total))
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            "SELECT id, title, content, author_id, date_posted FROM posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, title, content, author_id, date_posted)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, title, content, author_id, date_posted
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn update_post(&self, post_id: Uuid, write: &PostWrite) -> Result<Post> {
        // date_posted is never rewritten
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $1, content = $2, author_id = $3
            WHERE id = $4
            RETURNING id, title, content, author_id, date_posted
            "#,
        )
        .bind(&write.title)
        .bind(&write.content)
        .bind(write.author_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        Ok(())
    }
}
