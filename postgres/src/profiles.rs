//! User profiles.

use crate::db_error;
use async_trait::async_trait;
use clubpass_core::error::RepositoryError;
use clubpass_core::repository::ProfileRepository;
use clubpass_core::types::{Profile, UserId};
use sqlx::PgPool;
use uuid::Uuid;

/// `PostgreSQL` profile repository.
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<(Uuid, String, Option<String>)> =
            sqlx::query_as("SELECT id, email, full_name FROM profiles WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load profile", &e))?;

        Ok(row.map(|(id, email, full_name)| Profile {
            id: UserId::from_uuid(id),
            email,
            full_name,
        }))
    }

    async fn upsert(&self, profile: &Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, email, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                    updated_at = now()
            ",
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.email)
        .bind(&profile.full_name)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save profile", &e))?;
        Ok(())
    }
}
