//! `PostgreSQL` repositories for the Clubpass booking core.
//!
//! Implements the repository traits from `clubpass-core` over a sqlx pool:
//!
//! - [`PgEventRepository`]: read-only event catalogue
//! - [`PgProfileRepository`]: user profiles
//! - [`PgBookingRepository`]: bookings with compare-and-set status updates
//!
//! Amounts are stored as `BIGINT` minor units. The schema lives in
//! `migrations/` and is applied with [`migrate`].
//!
//! # Example
//!
//! ```no_run
//! use clubpass_postgres::{connect, migrate, PgBookingRepository, PoolSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect(&PoolSettings::new("postgres://localhost/clubpass")).await?;
//! migrate(&pool).await?;
//! let bookings = PgBookingRepository::new(pool);
//! # Ok(())
//! # }
//! ```

mod bookings;
mod events;
mod profiles;
mod rows;

pub use bookings::PgBookingRepository;
pub use events::PgEventRepository;
pub use profiles::PgProfileRepository;

use clubpass_core::error::RepositoryError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Connection string
    pub url: String,
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    /// Defaults for `url`: 10 connections max, 1 min, 5 s acquire timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`RepositoryError::Database`] if the database is unreachable.
pub async fn connect(settings: &PoolSettings) -> Result<PgPool, RepositoryError> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&settings.url)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to connect: {e}")))
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns [`RepositoryError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Migration failed: {e}")))
}

/// Round-trip a trivial query, for readiness checks.
///
/// # Errors
///
/// Returns [`RepositoryError::Database`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| RepositoryError::Database(e.to_string()))
}

fn db_error(context: &str, e: &sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{context}: {db_err}"));
        }
    }
    RepositoryError::Database(format!("{context}: {e}"))
}
