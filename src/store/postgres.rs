use {
    super::DataStore,
    crate::{DatabaseConfig, Error, Result},
    async_trait::async_trait,
    sqlx_postgres::PgPool,
};

/// [`DataStore`] backed by a lazy Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    /// Builds the pool without opening any connection. Must be called inside a
    /// Tokio runtime.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            pool: config.create_pool()?,
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for route groups that query the database.
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    async fn select_one(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for PgDataStore {
    async fn connect(&self) -> Result<()> {
        self.select_one().await.map_err(|err| {
            Error::database(format!("Could not connect to Postgres: {err}"))
        })?;
        tracing::info!("Connected to Postgres");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.select_one().await
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
