use axum::extract::Path;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::database::{DataClient, ScopedDataClient};
use crate::error::ApiError;
use crate::filter::Filters;
use crate::handlers::ok;

#[derive(Debug, Deserialize)]
pub struct CreatePostPayload {
    pub title: String,
    pub body: String,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "draft".to_string()
}

/// POST /api/posts
pub async fn create_post(
    ctx: AuthContext,
    Json(payload): Json<CreatePostPayload>,
) -> Result<Json<Value>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let db = ScopedDataClient::for_context(&ctx).await?;
    // author_id is the caller; the insert policy rejects writing as anyone else
    let post = db
        .insert(
            "blog_posts",
            json!({
                "author_id": ctx.principal.id,
                "category_id": payload.category_id,
                "title": payload.title,
                "body": payload.body,
                "status": payload.status,
            }),
        )
        .await?;
    Ok(ok(post))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<String>,
}

/// PATCH /api/posts/:id
///
/// Zero rows updated means the post is absent or policy-hidden (not the
/// caller's); both are reported as NotFound.
pub async fn update_post(
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostPayload>,
) -> Result<Json<Value>, ApiError> {
    let mut patch = Map::new();
    if let Some(title) = payload.title {
        patch.insert("title".to_string(), json!(title));
    }
    if let Some(body) = payload.body {
        patch.insert("body".to_string(), json!(body));
    }
    if let Some(category_id) = payload.category_id {
        patch.insert("category_id".to_string(), json!(category_id));
    }
    if let Some(status) = payload.status {
        patch.insert("status".to_string(), json!(status));
    }
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    patch.insert("updated_at".to_string(), json!(chrono::Utc::now()));

    let db = ScopedDataClient::for_context(&ctx).await?;
    let updated = db
        .update(
            "blog_posts",
            Value::Object(patch),
            &Filters::new().eq("id", json!(id)),
        )
        .await?;

    updated
        .into_iter()
        .next()
        .map(ok)
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

/// DELETE /api/posts/:id
pub async fn delete_post(ctx: AuthContext, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;
    let deleted = db
        .delete("blog_posts", &Filters::new().eq("id", json!(id)))
        .await?;
    if deleted.is_empty() {
        return Err(ApiError::not_found("Post not found"));
    }
    Ok(ok(json!({ "deleted": true })))
}
