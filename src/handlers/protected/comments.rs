use axum::extract::Path;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::database::{DataClient, ScopedDataClient};
use crate::error::ApiError;
use crate::filter::{Filters, SelectOptions};
use crate::handlers::ok;
use crate::services::notifications::{create_notification, NewNotification, NotificationKind};

#[derive(Debug, Deserialize)]
pub struct CreateCommentPayload {
    pub body: String,
}

/// POST /api/posts/:id/comments
pub async fn create_comment(
    ctx: AuthContext,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentPayload>,
) -> Result<Json<Value>, ApiError> {
    if payload.body.trim().is_empty() {
        return Err(ApiError::bad_request("Comment body is required"));
    }

    let db = ScopedDataClient::for_context(&ctx).await?;

    let post = db
        .select(
            "blog_posts",
            &["id", "author_id", "title"],
            &Filters::new().eq("id", json!(post_id)),
            &SelectOptions::default(),
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let comment = db
        .insert(
            "comments",
            json!({
                "post_id": post_id,
                "author_id": ctx.principal.id,
                "body": payload.body,
            }),
        )
        .await?;

    // Best-effort author notification; skip when commenting on your own post
    let author_id = post
        .get("author_id")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<Uuid>().ok());
    if let Some(author_id) = author_id.filter(|a| *a != ctx.principal.id) {
        let title = post.get("title").and_then(|v| v.as_str()).unwrap_or("your post");
        let comment_id = comment
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Uuid>().ok());
        create_notification(
            &db,
            NewNotification {
                recipient_id: author_id,
                title: "New comment".to_string(),
                message: format!("New comment on \"{}\"", title),
                kind: NotificationKind::Comment,
                related_post_id: Some(post_id),
                related_comment_id: comment_id,
                related_user_id: Some(ctx.principal.id),
            },
        )
        .await;
    }

    Ok(ok(comment))
}

/// DELETE /api/comments/:id
pub async fn delete_comment(
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;
    let deleted = db
        .delete("comments", &Filters::new().eq("id", json!(id)))
        .await?;
    if deleted.is_empty() {
        return Err(ApiError::not_found("Comment not found"));
    }
    Ok(ok(json!({ "deleted": true })))
}
