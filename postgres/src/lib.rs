//! `PostgreSQL` storage for the clinic scheduling backend.
//!
//! [`PostgresClinicStore`] implements every repository trait from
//! `clinic-core` over a shared [`PgPool`]. Each operation is one transaction:
//!
//! - Booking claims the slot with a conditional `UPDATE ... WHERE is_booked = FALSE`
//!   in the same transaction as the appointment write
//! - Cancellation and completion lock the appointment row (`FOR UPDATE`), run
//!   the lifecycle reducer and execute its effects before committing
//! - Review writes lock the provider row and recompute its rating before committing
//!
//! # Example
//!
//! ```no_run
//! use clinic_core::SystemClock;
//! use clinic_postgres::PostgresClinicStore;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgres://localhost/clinic").await?;
//! let store = PostgresClinicStore::new(pool, Arc::new(SystemClock));
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use clinic_core::environment::Clock;
use clinic_core::{ProviderId, Result, SchedulingError};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

mod appointments;
mod identity;
mod reviews;
mod rows;
mod slots;

/// `PostgreSQL` clinic store.
#[derive(Clone)]
pub struct PostgresClinicStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
    /// Source of timestamps written by this store.
    clock: Arc<dyn Clock>,
}

impl PostgresClinicStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SchedulingError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

/// Wrap a driver error with what was being attempted.
pub(crate) fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> SchedulingError {
    move |e| SchedulingError::Storage(format!("{context}: {e}"))
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Take the provider row lock, serializing rating and slot writes per provider.
///
/// Returns `false` if the provider does not exist.
pub(crate) async fn lock_provider(conn: &mut PgConnection, provider_id: ProviderId) -> Result<bool> {
    let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM providers WHERE id = $1 FOR UPDATE")
        .bind(provider_id.get())
        .fetch_optional(conn)
        .await
        .map_err(storage("Failed to lock provider"))?;
    Ok(locked.is_some())
}
