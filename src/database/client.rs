use async_trait::async_trait;
use serde_json::Value;

use super::error::StoreError;
use crate::filter::{Filters, SelectOptions};

/// The seam between route/service logic and the store.
///
/// Both the credential-scoped client and the policy-bypassing admin client
/// implement this, as do in-memory fakes in tests. Rows are plain JSON objects;
/// the caller knows the table shape, the data layer does not.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Returns all rows visible under the bound credential's policy that match
    /// the filters. Empty filters means "everything visible", not "everything".
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &Filters,
        options: &SelectOptions,
    ) -> Result<Vec<Value>, StoreError>;

    /// Returns the row as persisted, including store-generated fields.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Applies `patch` to the filtered rows that are also writable under
    /// policy. Zero matching rows is not an error; the result is empty and the
    /// caller decides what that means.
    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &Filters,
    ) -> Result<Vec<Value>, StoreError>;

    /// Same zero-rows semantics as `update`.
    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, StoreError>;

    /// Escape hatch for operations not expressible as filtered CRUD, e.g.
    /// atomic counter math. Still runs under the bound credential.
    async fn rpc(&self, name: &str, params: Value) -> Result<Value, StoreError>;
}
