//! # Schema Migrations
//!
//! The counter schema lives in `migrations/sqlite/` at the workspace root and
//! is compiled into the binary. Existing files are never edited; schema
//! changes get a new `NNN_description.sql`.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever migrations the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying counter schema");
    MIGRATOR.run(pool).await?;
    info!("Counter schema up to date");
    Ok(())
}
