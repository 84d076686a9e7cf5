use axum::extract::{Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::database::{DataClient, ScopedDataClient};
use crate::error::ApiError;
use crate::filter::{Filters, OrderBy};
use crate::handlers::{ok, page_options};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    /// When true, only unread notifications are returned
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/notifications - newest first, scoped to the caller by policy.
pub async fn list_notifications(
    ctx: AuthContext,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;

    let mut filters = Filters::new().eq("recipient_id", json!(ctx.principal.id));
    if query.unread {
        filters = filters.eq("read", json!(false));
    }

    let options = page_options(None, &[], query.limit, query.offset, OrderBy::desc("created_at"))?;
    let notifications = db.select("notifications", &[], &filters, &options).await?;
    Ok(ok(notifications))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(ctx: AuthContext, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;
    let updated = db
        .update(
            "notifications",
            json!({ "read": true }),
            &Filters::new()
                .eq("id", json!(id))
                .eq("recipient_id", json!(ctx.principal.id)),
        )
        .await?;

    updated
        .into_iter()
        .next()
        .map(ok)
        .ok_or_else(|| ApiError::not_found("Notification not found"))
}

/// POST /api/notifications/read-all
///
/// Zero rows updated simply means there was nothing unread; that is a
/// success, not an error.
pub async fn read_all(ctx: AuthContext) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;
    let updated = db
        .update(
            "notifications",
            json!({ "read": true }),
            &Filters::new()
                .eq("recipient_id", json!(ctx.principal.id))
                .eq("read", json!(false)),
        )
        .await?;
    Ok(ok(json!({ "updated": updated.len() })))
}
