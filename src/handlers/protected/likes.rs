use axum::extract::Path;
use axum::response::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::database::ScopedDataClient;
use crate::error::ApiError;
use crate::handlers::ok;
use crate::services::likes::toggle_like;

/// POST /api/posts/:id/like - flip the caller's like on a post.
pub async fn toggle(ctx: AuthContext, Path(post_id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;
    let result = toggle_like(&db, post_id, ctx.principal.id).await?;
    Ok(ok(result))
}
