//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! loyalty migrate
//! ```
//!
//! # Environment Variables
//!
//! - `LOYALTY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations are embedded from `crates/server/migrations/`:
//! ```text
//! migrations/
//! ├── 20260301000001_create_merchant.sql
//! └── 20260301000002_create_reward_ledger.sql
//! ```

use loyalty_server::db;

use super::{CommandError, database_url};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to loyalty database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running loyalty migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Loyalty migrations complete!");
    Ok(())
}
