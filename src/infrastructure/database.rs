use crate::config::Settings;
use crate::{Error, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

/// Database connection pool wrapper
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized from settings; both actors share it
    #[instrument(skip(settings), fields(host = %settings.database.host))]
    pub async fn connect(settings: &Settings) -> Result<Self> {
        info!("Connecting to database at {}", settings.database.host);
        let pool = PgPoolOptions::new()
            .max_connections(settings.database.max_connections)
            .connect(&settings.database_url())
            .await?;
        Ok(Self::new(pool))
    }

    pub fn into_pool(self) -> PgPool {
        self.pool
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<()> {
        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await?;

        let health_check: i32 = row.try_get("health_check")?;

        if health_check == 1 {
            Ok(())
        } else {
            Err(Error::store("Database health check failed"))
        }
    }
}
