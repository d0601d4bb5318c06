//! Read-only access to the campaign-attribution store.

use std::future::Future;
use std::time::Duration;

use mbi_core::{CampaignDataset, ClientScope, DatabaseConfig};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use thiserror::Error;

pub mod campaigns;

pub use campaigns::{
    fetch_campaign_records, list_clients, CampaignRow, MAX_CAMPAIGN_ROWS, MAX_LISTED_CLIENTS,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    /// One analysis needs exactly one session; only the acquire timeout is
    /// configurable.
    #[must_use]
    pub fn from_database_config(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: config.acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not connect to campaign store at {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("campaign store query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Build connection options from discrete settings so the password never
/// passes through a URL string.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .password(&config.password)
}

/// Open a pool against the campaign store.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(
    options: PgConnectOptions,
    config: PoolConfig,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Where campaign data comes from. The orchestrator is generic over this so
/// it can run against an in-memory source in tests.
pub trait CampaignSource {
    /// Clients with attributed spots in the lookback window, busiest first.
    fn list_clients(
        &self,
        lookback_days: u32,
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    /// Attributed spot records for `scope` in the lookback window.
    fn fetch_campaign_data(
        &self,
        scope: &ClientScope,
        lookback_days: u32,
    ) -> impl Future<Output = Result<CampaignDataset, DbError>> + Send;

    /// Release whatever session backs the source.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// A scoped session on the campaign store. Call [`CampaignStore::close`]
/// when the run finishes.
#[derive(Debug, Clone)]
pub struct CampaignStore {
    pool: PgPool,
}

impl CampaignStore {
    /// Connect and verify the session with a ping.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the store is unreachable or rejects
    /// the credentials.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let target = format!("{}:{}/{}", config.host, config.port, config.name);
        let connection_error = |source| DbError::Connection {
            target: target.clone(),
            source,
        };

        let pool = connect_pool(
            connect_options(config),
            PoolConfig::from_database_config(config),
        )
        .await
        .map_err(connection_error)?;
        ping(&pool).await.map_err(connection_error)?;

        tracing::info!(store = %target, "connected to campaign store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool. Used by the live tests.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Release the session. Waits for the connection to be returned and
    /// closed.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("campaign store session closed");
    }
}

impl CampaignSource for CampaignStore {
    async fn list_clients(&self, lookback_days: u32) -> Result<Vec<String>, DbError> {
        list_clients(&self.pool, lookback_days).await
    }

    async fn fetch_campaign_data(
        &self,
        scope: &ClientScope,
        lookback_days: u32,
    ) -> Result<CampaignDataset, DbError> {
        let records = fetch_campaign_records(&self.pool, scope, lookback_days).await?;
        tracing::info!(
            scope = %scope,
            lookback_days,
            records = records.len(),
            "fetched campaign data"
        );
        Ok(CampaignDataset::new(scope.clone(), lookback_days, records))
    }

    async fn close(self) {
        CampaignStore::close(self).await;
    }
}
