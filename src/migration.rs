//! Versioned schema migrations, embedded at compile time and applied on
//! startup. Applied versions are tracked in `_sqlx_migrations`.

use sqlx::migrate::Migrator;
use tracing::info;

use crate::{dao::PoolType, error::Error};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &PoolType) -> Result<(), Error> {
    info!("Running database migrations...");

    MIGRATOR.run(pool).await.map_err(|error| {
        Error::ConfigurationError(format!("Migration failed: {}", error))
    })?;

    info!(
        "Database schema at version {}",
        MIGRATOR
            .iter()
            .map(|migration| migration.version)
            .max()
            .unwrap_or_default()
    );

    Ok(())
}
