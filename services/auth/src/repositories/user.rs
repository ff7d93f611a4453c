//! User repository for database operations

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{STARTING_CREDITS, UserAccounts};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str =
    "id, email, name, image, credits, provider_id, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        image: row.get("image"),
        credits: row.get("credits"),
        provider_id: row.get("provider_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserAccounts for UserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_or_create(&self, new_user: &NewUser) -> Result<User> {
        // Concurrent first sign-ins race on the unique email; the loser reads the winner's row
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, image, credits, provider_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.image)
        .bind(STARTING_CREDITS)
        .bind(&new_user.provider_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let user = self
            .find_by_email(&new_user.email)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", new_user.email))?;

        if inserted == 1 {
            info!("Created user {} on first sign-in", user.id);
        }

        Ok(user)
    }
}
