use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Row};

use super::client::DataClient;
use super::credential::Credential;
use super::error::{classify, StoreError};
use super::manager::PoolManager;
use crate::auth::AuthContext;
use crate::config;
use crate::filter::{Compose, Filters, SelectOptions, SqlQuery};

/// Data-access facade bound to exactly one caller credential.
///
/// Constructed per request (or per background operation) and never reused
/// across principals. Every operation runs in its own transaction with the
/// credential bound first, so server-side row-level policies see the correct
/// identity on each statement.
pub struct ScopedDataClient {
    pool: PgPool,
    credential: Credential,
}

impl ScopedDataClient {
    /// Client for a resolved, authenticated caller.
    pub async fn for_context(ctx: &AuthContext) -> Result<Self, StoreError> {
        Ok(Self {
            pool: PoolManager::app_pool().await?,
            credential: Credential::from_context(ctx),
        })
    }

    /// Client for public endpoints with no credential; sees only what the
    /// anonymous policy exposes.
    pub async fn anonymous() -> Result<Self, StoreError> {
        Ok(Self {
            pool: PoolManager::app_pool().await?,
            credential: Credential::Anonymous,
        })
    }
}

#[async_trait]
impl DataClient for ScopedDataClient {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &Filters,
        options: &SelectOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let query = Compose::select(table, columns, filters, options)?;
        run(&self.pool, &self.credential, query, "row").await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let query = Compose::insert(table, &row)?;
        let mut rows = run(&self.pool, &self.credential, query, "row").await?;
        rows.pop()
            .ok_or_else(|| StoreError::PolicyDenied("insert returned no row".to_string()))
    }

    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &Filters,
    ) -> Result<Vec<Value>, StoreError> {
        let query = Compose::update(table, &patch, filters)?;
        run(&self.pool, &self.credential, query, "row").await
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, StoreError> {
        let query = Compose::delete(table, filters)?;
        run(&self.pool, &self.credential, query, "row").await
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value, StoreError> {
        let query = Compose::rpc(name, params)?;
        let mut rows = run(&self.pool, &self.credential, query, "result").await?;
        Ok(rows.pop().unwrap_or(Value::Null))
    }
}

/// Privileged variant bound to the service credential, which bypasses
/// row-level policy entirely.
///
/// Construct only inside operations that must cross ownership boundaries
/// (cascading deletes, moderation). Every call site is a deliberate, auditable
/// exception to the policy model.
pub struct AdminDataClient {
    pool: PgPool,
}

impl AdminDataClient {
    pub async fn connect() -> Result<Self, StoreError> {
        Ok(Self {
            pool: PoolManager::service_pool().await?,
        })
    }
}

#[async_trait]
impl DataClient for AdminDataClient {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &Filters,
        options: &SelectOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let query = Compose::select(table, columns, filters, options)?;
        run(&self.pool, &Credential::Service, query, "row").await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let query = Compose::insert(table, &row)?;
        let mut rows = run(&self.pool, &Credential::Service, query, "row").await?;
        rows.pop()
            .ok_or_else(|| StoreError::MalformedQuery("insert returned no row".to_string()))
    }

    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &Filters,
    ) -> Result<Vec<Value>, StoreError> {
        let query = Compose::update(table, &patch, filters)?;
        run(&self.pool, &Credential::Service, query, "row").await
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, StoreError> {
        let query = Compose::delete(table, filters)?;
        run(&self.pool, &Credential::Service, query, "row").await
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value, StoreError> {
        let query = Compose::rpc(name, params)?;
        let mut rows = run(&self.pool, &Credential::Service, query, "result").await?;
        Ok(rows.pop().unwrap_or(Value::Null))
    }
}

/// Execute one composed statement under the given credential.
///
/// Credential binding and the statement share a transaction; `SET LOCAL` state
/// dies with it, so nothing leaks onto the pooled connection.
async fn run(
    pool: &PgPool,
    credential: &Credential,
    query: SqlQuery,
    column: &str,
) -> Result<Vec<Value>, StoreError> {
    let mut tx = pool.begin().await.map_err(classify)?;
    credential.bind(&mut tx).await?;

    if config::config().database.enable_query_logging {
        tracing::debug!(sql = %query.sql, params = query.params.len(), "store query");
    }

    let mut q = sqlx::query(&query.sql);
    for p in query.params.iter() {
        q = bind_param(q, p);
    }
    let rows = q.fetch_all(&mut *tx).await.map_err(classify)?;
    tx.commit().await.map_err(classify)?;

    rows.iter()
        .map(|row| {
            row.try_get::<Value, _>(column)
                .map_err(|e| StoreError::MalformedQuery(e.to_string()))
        })
        .collect()
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Membership filters are expanded into scalar placeholders by Compose;
        // an array reaching this point is a row/patch value and binds as JSONB,
        // same as an object. Skipping it would desync the $n placeholders.
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
