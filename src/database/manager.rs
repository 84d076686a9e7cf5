use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

use super::error::{classify, StoreError};
use crate::config;

/// Env var holding the connection string for the restricted application role.
/// Requests run through this pool with `SET LOCAL ROLE`, so row-level policies
/// apply to everything it touches.
const APP_URL_VAR: &str = "DATABASE_URL";

/// Env var holding the service-level connection string. This role bypasses
/// row-level security entirely; only AdminDataClient may use it.
const SERVICE_URL_VAR: &str = "SERVICE_DATABASE_URL";

/// Centralized connection pool manager. Pools are process-level resources;
/// per-request credential state never lives here.
pub struct PoolManager {
    pools: Arc<RwLock<HashMap<&'static str, PgPool>>>,
}

impl PoolManager {
    fn instance() -> &'static PoolManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<PoolManager> = OnceLock::new();
        INSTANCE.get_or_init(|| PoolManager {
            pools: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Pool for credential-bound (and anonymous) request traffic.
    pub async fn app_pool() -> Result<PgPool, StoreError> {
        Self::instance().get_pool(APP_URL_VAR).await
    }

    /// Pool for the policy-bypassing service credential.
    pub async fn service_pool() -> Result<PgPool, StoreError> {
        Self::instance().get_pool(SERVICE_URL_VAR).await
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, url_var: &'static str) -> Result<PgPool, StoreError> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(url_var) {
                return Ok(pool.clone());
            }
        }

        let url = std::env::var(url_var)
            .map_err(|_| StoreError::Unavailable(format!("{} is not set", url_var)))?;

        let db = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.acquire_timeout_secs))
            .connect(&url)
            .await
            .map_err(classify)?;

        {
            let mut pools = self.pools.write().await;
            pools.insert(url_var, pool.clone());
        }

        info!("Created database pool for {}", url_var);
        Ok(pool)
    }

    /// Pings the application pool to ensure connectivity
    pub async fn health_check() -> Result<(), StoreError> {
        let pool = Self::app_pool().await?;
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// Apply embedded migrations through the service pool (schema changes need
    /// the privileged role).
    pub async fn run_migrations() -> Result<(), StoreError> {
        let pool = Self::service_pool().await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all() {
        let manager = Self::instance();
        let mut pools = manager.pools.write().await;
        for (name, pool) in pools.drain() {
            pool.close().await;
            info!("Closed database pool: {}", name);
        }
    }
}
