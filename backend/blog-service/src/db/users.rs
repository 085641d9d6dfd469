/// User and profile database operations
use super::{AccountChanges, IdentityStore};
use crate::error::{AppError, Result};
use crate::models::{NewUser, Profile, User, DEFAULT_PROFILE_IMAGE};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, date_joined";

/// Postgres-backed identity store
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

async fn upsert_profile_image(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    image: &str,
) -> Result<Profile> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (user_id, image)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET image = EXCLUDED.image
        RETURNING user_id, image
        "#,
    )
    .bind(user_id)
    .bind(image)
    .fetch_one(&mut **tx)
    .await?;

    Ok(profile)
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    /// Find user by username (case-sensitive, like the unique constraint)
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_user_by("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_user_by("email", email).await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Create a new user and its profile in one transaction
    async fn create_user(&self, new_user: &NewUser) -> Result<(User, Profile)> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, date_joined)
            VALUES ($1, $2, $3, $4, CURRENT_TIMESTAMP)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        // A duplicate username/email fails here on the unique constraint and
        // the transaction is rolled back on drop.
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(new_user.id)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&mut *tx)
            .await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, image)
            VALUES ($1, $2)
            RETURNING user_id, image
            "#,
        )
        .bind(user.id)
        .bind(DEFAULT_PROFILE_IMAGE)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, profile))
    }

    async fn create_profile(&self, user_id: Uuid) -> Result<Profile> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, image)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(DEFAULT_PROFILE_IMAGE)
        .execute(&self.pool)
        .await?;

        let profile =
            sqlx::query_as::<_, Profile>("SELECT user_id, image FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(profile)
    }

    async fn update_account(
        &self,
        user_id: Uuid,
        changes: &AccountChanges,
    ) -> Result<(User, Profile)> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE users
            SET username = $1, email = $2
            WHERE id = $3
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;

        let profile = match &changes.image {
            Some(image) => upsert_profile_image(&mut tx, user_id, image).await?,
            None => {
                sqlx::query_as::<_, Profile>(
                    "SELECT user_id, image FROM profiles WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or_else(|| Profile::new(user_id))
            }
        };

        tx.commit().await?;

        Ok((user, profile))
    }

    async fn update_profile_image(&self, user_id: Uuid, image: &str) -> Result<Profile> {
        let mut tx = self.pool.begin().await?;
        let profile = upsert_profile_image(&mut tx, user_id, image).await?;
        tx.commit().await?;

        Ok(profile)
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        // profiles and posts cascade
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }

        Ok(())
    }
}
