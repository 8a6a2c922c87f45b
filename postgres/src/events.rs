//! Event catalogue.

use crate::db_error;
use crate::rows::{EVENT_COLUMNS, EventRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clubpass_core::error::RepositoryError;
use clubpass_core::repository::EventRepository;
use clubpass_core::types::{Event, EventId};
use sqlx::PgPool;

/// `PostgreSQL` event repository.
#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn get(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        sqlx::query_as::<_, EventRow>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load event", &e))?
            .map(Event::try_from)
            .transpose()
    }

    async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Event>, RepositoryError> {
        sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_date >= $1 ORDER BY event_date ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list events", &e))?
        .into_iter()
        .map(Event::try_from)
        .collect()
    }
}
