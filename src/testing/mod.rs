//! In-memory [`DataClient`] fake for unit tests.
//!
//! Each test constructs its own store, mirroring the production rule that data
//! clients are per-request values with no cross-request state. The fake applies
//! the same filter classification semantics as the SQL composer: Eq, In
//! (membership), ILike (case-insensitive `%` wildcard).
//!
//! Handles share one table set but carry a viewer, a scaled-down model of the
//! store's row policies: the default handle is the service credential and sees
//! everything; [`MemoryStore::as_principal`] and [`MemoryStore::as_anonymous`]
//! produce policy-restricted views over the same data.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::database::{DataClient, StoreError};
use crate::filter::{FilterValue, Filters, SelectOptions, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Viewer {
    Service,
    Anonymous,
    Principal(Uuid),
}

#[derive(Default)]
struct Shared {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    unique_keys: Mutex<Vec<(String, Vec<String>)>>,
    failing_inserts: Mutex<HashSet<String>>,
    failing_rpcs: Mutex<HashSet<String>>,
}

pub struct MemoryStore {
    shared: Arc<Shared>,
    viewer: Viewer,
}

impl MemoryStore {
    /// Service-credential handle: sees and mutates everything.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            viewer: Viewer::Service,
        }
    }

    /// Handle over the same tables, restricted to what `id` may see.
    pub fn as_principal(&self, id: Uuid) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            viewer: Viewer::Principal(id),
        }
    }

    /// Handle over the same tables with no principal at all.
    pub fn as_anonymous(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            viewer: Viewer::Anonymous,
        }
    }

    /// Declare a composite unique key, enforced on insert like a store-side
    /// unique constraint (surfaces as `StoreError::Conflict`).
    pub fn with_unique(self, table: &str, columns: &[&str]) -> Self {
        self.shared.unique_keys.lock().unwrap().push((
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn seed(&self, table: &str, row: Value) {
        let mut tables = self.shared.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.shared.tables.lock().unwrap();
        tables.get(table).cloned().unwrap_or_default()
    }

    /// Make subsequent inserts into `table` fail, for exercising best-effort
    /// side-effect paths.
    pub fn fail_inserts(&self, table: &str) {
        self.shared
            .failing_inserts
            .lock()
            .unwrap()
            .insert(table.to_string());
    }

    pub fn fail_rpc(&self, name: &str) {
        self.shared
            .failing_rpcs
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    /// Undo [`fail_rpc`](Self::fail_rpc), for outage-then-recovery scenarios.
    pub fn restore_rpc(&self, name: &str) {
        self.shared.failing_rpcs.lock().unwrap().remove(name);
    }

    /// Scaled-down row policy, mirroring the shapes the real policies take:
    /// drafts are visible to their author only, notifications to their
    /// recipient only, everything else is readable.
    fn visible(&self, table: &str, row: &Value) -> bool {
        let principal = match self.viewer {
            Viewer::Service => return true,
            Viewer::Anonymous => None,
            Viewer::Principal(id) => Some(json!(id)),
        };
        match table {
            "blog_posts" => {
                row.get("status") == Some(&json!("published"))
                    || (principal.is_some() && row.get("author_id") == principal.as_ref())
            }
            "notifications" => {
                principal.is_some() && row.get("recipient_id") == principal.as_ref()
            }
            _ => true,
        }
    }

    fn check_unique(&self, table: &str, row: &Value, existing: &[Value]) -> Result<(), StoreError> {
        for (t, columns) in self.shared.unique_keys.lock().unwrap().iter() {
            if t != table {
                continue;
            }
            let clash = existing.iter().any(|other| {
                columns
                    .iter()
                    .all(|c| other.get(c.as_str()) == row.get(c.as_str()))
            });
            if clash {
                return Err(StoreError::Conflict(format!(
                    "duplicate key on {}({})",
                    table,
                    columns.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataClient for MemoryStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filters: &Filters,
        options: &SelectOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.shared.tables.lock().unwrap();
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| self.visible(table, row) && matches_filters(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &options.order {
            rows.sort_by(|a, b| {
                let ordering = cmp_values(
                    a.get(order.column.as_str()).unwrap_or(&Value::Null),
                    b.get(order.column.as_str()).unwrap_or(&Value::Null),
                );
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let offset = options.offset.unwrap_or(0).max(0) as usize;
        let rows: Vec<Value> = rows.into_iter().skip(offset).collect();
        let rows: Vec<Value> = match options.limit {
            Some(limit) => rows.into_iter().take(limit.max(0) as usize).collect(),
            None => rows,
        };

        Ok(rows.into_iter().map(|row| project(row, columns)).collect())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        if self.shared.failing_inserts.lock().unwrap().contains(table) {
            return Err(StoreError::Unavailable(format!(
                "injected insert failure for {}",
                table
            )));
        }

        let mut object = match row {
            Value::Object(map) => map,
            _ => return Err(StoreError::MalformedQuery("row must be an object".to_string())),
        };
        if !object.contains_key("id") {
            object.insert("id".to_string(), json!(Uuid::new_v4()));
        }
        if !object.contains_key("created_at") {
            object.insert("created_at".to_string(), json!(chrono::Utc::now()));
        }
        let persisted = Value::Object(object);

        let mut tables = self.shared.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        self.check_unique(table, &persisted, rows)?;
        rows.push(persisted.clone());
        Ok(persisted)
    }

    async fn update(
        &self,
        table: &str,
        patch: Value,
        filters: &Filters,
    ) -> Result<Vec<Value>, StoreError> {
        if filters.is_empty() {
            return Err(StoreError::MalformedQuery("unscoped update".to_string()));
        }
        let patch = patch
            .as_object()
            .ok_or_else(|| StoreError::MalformedQuery("patch must be an object".to_string()))?
            .clone();

        let mut tables = self.shared.tables.lock().unwrap();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if self.visible(table, row) && matches_filters(row, filters) {
                    if let Value::Object(map) = row {
                        for (k, v) in &patch {
                            map.insert(k.clone(), v.clone());
                        }
                    }
                    updated.push(row.clone());
                }
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, StoreError> {
        if filters.is_empty() {
            return Err(StoreError::MalformedQuery("unscoped delete".to_string()));
        }
        let mut tables = self.shared.tables.lock().unwrap();
        let mut deleted = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| {
                if self.visible(table, row) && matches_filters(row, filters) {
                    deleted.push(row.clone());
                    false
                } else {
                    true
                }
            });
        }
        Ok(deleted)
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value, StoreError> {
        if self.shared.failing_rpcs.lock().unwrap().contains(name) {
            return Err(StoreError::Unavailable(format!(
                "injected rpc failure for {}",
                name
            )));
        }
        match name {
            "adjust_like_count" => {
                let delta = params.get("delta").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(self.write_like_count(&params, |likes| likes + delta))
            }
            "set_like_count" => {
                let count = params.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(self.write_like_count(&params, |_| count))
            }
            other => Err(StoreError::MalformedQuery(format!("unknown function {}", other))),
        }
    }
}

impl MemoryStore {
    fn write_like_count(&self, params: &Value, apply: impl Fn(i64) -> i64) -> Value {
        let post_id = params.get("post_id").cloned().unwrap_or(Value::Null);
        let mut tables = self.shared.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut("blog_posts") {
            for row in rows.iter_mut() {
                if row.get("id") == Some(&post_id) {
                    let current = row.get("likes").and_then(|v| v.as_i64()).unwrap_or(0);
                    let likes = apply(current).max(0);
                    if let Value::Object(map) = row {
                        map.insert("likes".to_string(), json!(likes));
                    }
                    return json!(likes);
                }
            }
        }
        Value::Null
    }
}

fn matches_filters(row: &Value, filters: &Filters) -> bool {
    filters.iter().all(|(column, value)| {
        let actual = row.get(column.as_str()).unwrap_or(&Value::Null);
        match value {
            FilterValue::Eq(expected) => actual == expected,
            FilterValue::In(values) => values.contains(actual),
            FilterValue::ILike(pattern) => actual
                .as_str()
                .map(|s| ilike_match(pattern, s))
                .unwrap_or(false),
        }
    })
}

/// Case-insensitive `%`-wildcard match, the fake's analogue of SQL ILIKE.
fn ilike_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0usize;
    let first = parts[0];
    if !first.is_empty() {
        if !text.starts_with(first) {
            return false;
        }
        pos = first.len();
    }
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }
    let last = parts[parts.len() - 1];
    last.is_empty() || text[pos..].ends_with(last)
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => value_text(a).cmp(&value_text(b)),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn project(row: Value, columns: &[&str]) -> Value {
    if columns.is_empty() || columns.contains(&"*") {
        return row;
    }
    let Value::Object(map) = row else { return row };
    let mut projected = Map::new();
    for column in columns {
        if let Some(v) = map.get(*column) {
            projected.insert((*column).to_string(), v.clone());
        }
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ilike_wildcards() {
        assert!(ilike_match("%rust%", "Practical Rust patterns"));
        assert!(ilike_match("hello%", "Hello world"));
        assert!(ilike_match("%world", "hello WORLD"));
        assert!(ilike_match("exact", "EXACT"));
        assert!(!ilike_match("%go%", "rust only"));
        assert!(!ilike_match("hello%", "say hello"));
    }

    #[tokio::test]
    async fn select_honors_order_and_page() {
        let store = MemoryStore::new();
        for n in [3, 1, 2] {
            store.seed("blog_posts", json!({"id": n.to_string(), "status": "published", "likes": n}));
        }
        let rows = store
            .select(
                "blog_posts",
                &["id"],
                &Filters::new(),
                &SelectOptions::default()
                    .order_by(crate::filter::OrderBy::asc("likes"))
                    .page(2, 1),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], json!("2"));
        assert_eq!(rows[1]["id"], json!("3"));
    }

    fn seed_mixed_posts(store: &MemoryStore, author: Uuid, other: Uuid) {
        store.seed(
            "blog_posts",
            json!({"id": "pub-own", "author_id": author, "status": "published", "likes": 0}),
        );
        store.seed(
            "blog_posts",
            json!({"id": "draft-own", "author_id": author, "status": "draft", "likes": 0}),
        );
        store.seed(
            "blog_posts",
            json!({"id": "pub-other", "author_id": other, "status": "published", "likes": 0}),
        );
        store.seed(
            "blog_posts",
            json!({"id": "draft-other", "author_id": other, "status": "draft", "likes": 0}),
        );
    }

    fn ids(rows: &[Value]) -> Vec<String> {
        let mut ids: Vec<String> = rows
            .iter()
            .filter_map(|r| r.get("id").and_then(|v| v.as_str()).map(String::from))
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn policy_scoped_results_are_subset_of_service_results() {
        let service = MemoryStore::new();
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();
        seed_mixed_posts(&service, author, other);

        let everything = service
            .select("blog_posts", &[], &Filters::new(), &SelectOptions::default())
            .await
            .unwrap();
        assert_eq!(everything.len(), 4);

        for restricted in [service.as_anonymous(), service.as_principal(author)] {
            let scoped = restricted
                .select("blog_posts", &[], &Filters::new(), &SelectOptions::default())
                .await
                .unwrap();
            for row in &scoped {
                assert!(everything.contains(row), "scoped row not in service view");
            }
        }

        // The author additionally sees exactly their own draft
        let own = service.as_principal(author);
        let scoped = own
            .select("blog_posts", &[], &Filters::new(), &SelectOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&scoped), vec!["draft-own", "pub-other", "pub-own"]);
    }

    #[tokio::test]
    async fn anonymous_select_matches_unprivileged_principal() {
        let service = MemoryStore::new();
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();
        seed_mixed_posts(&service, author, other);

        let anonymous = service
            .as_anonymous()
            .select("blog_posts", &[], &Filters::new(), &SelectOptions::default())
            .await
            .unwrap();
        // A principal with no posts of their own gets the same public view
        let bystander = service
            .as_principal(Uuid::new_v4())
            .select("blog_posts", &[], &Filters::new(), &SelectOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&anonymous), vec!["pub-other", "pub-own"]);
        assert_eq!(ids(&anonymous), ids(&bystander));
    }

    #[tokio::test]
    async fn policy_restricts_writes_like_reads() {
        let service = MemoryStore::new();
        let author = Uuid::new_v4();
        seed_mixed_posts(&service, author, Uuid::new_v4());

        // A bystander cannot update or delete a draft hidden from them
        let bystander = service.as_principal(Uuid::new_v4());
        let target = Filters::new().eq("id", json!("draft-own"));
        let updated = bystander
            .update("blog_posts", json!({"title": "defaced"}), &target)
            .await
            .unwrap();
        assert!(updated.is_empty());
        let deleted = bystander.delete("blog_posts", &target).await.unwrap();
        assert!(deleted.is_empty());
        assert_eq!(service.rows("blog_posts").len(), 4);
    }

    #[tokio::test]
    async fn notifications_visible_to_recipient_only() {
        let service = MemoryStore::new();
        let recipient = Uuid::new_v4();
        service.seed(
            "notifications",
            json!({"id": "n1", "recipient_id": recipient, "read": false}),
        );

        let all = Filters::new().eq("read", json!(false));
        let own = service
            .as_principal(recipient)
            .select("notifications", &[], &all, &SelectOptions::default())
            .await
            .unwrap();
        assert_eq!(own.len(), 1);

        let foreign = service
            .as_principal(Uuid::new_v4())
            .select("notifications", &[], &all, &SelectOptions::default())
            .await
            .unwrap();
        assert!(foreign.is_empty());
    }
}
