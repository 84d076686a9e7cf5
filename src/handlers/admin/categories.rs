use axum::extract::Path;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::database::{AdminDataClient, DataClient, ScopedDataClient};
use crate::error::ApiError;
use crate::filter::{Filters, SelectOptions};
use crate::handlers::ok;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryPayload {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/admin/categories
///
/// Runs under the admin's own credential: the category insert policy already
/// admits admins, so no policy bypass is needed here.
pub async fn create_category(
    admin: AdminUser,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<Json<Value>, ApiError> {
    if payload.name.trim().is_empty() || payload.slug.trim().is_empty() {
        return Err(ApiError::bad_request("Name and slug are required"));
    }

    let db = ScopedDataClient::for_context(&admin.context).await?;
    let category = db
        .insert(
            "categories",
            json!({
                "name": payload.name,
                "slug": payload.slug,
                "description": payload.description,
            }),
        )
        .await?;
    Ok(ok(category))
}

/// DELETE /api/admin/categories/:id
///
/// Cascading delete across every author's content, so this is one of the few
/// operations that runs on the service credential. Likes and comments go
/// first, then the posts, then the category row itself.
pub async fn delete_category(
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let db = AdminDataClient::connect().await?;

    let posts = db
        .select(
            "blog_posts",
            &["id"],
            &Filters::new().eq("category_id", json!(id)),
            &SelectOptions::default(),
        )
        .await?;
    let post_ids: Vec<Value> = posts
        .iter()
        .filter_map(|p| p.get("id").cloned())
        .collect();

    let mut removed_posts = 0;
    if !post_ids.is_empty() {
        let by_post = Filters::new().any_of("post_id", post_ids.clone());
        db.delete("post_likes", &by_post).await?;
        db.delete("comments", &by_post).await?;
        removed_posts = db
            .delete("blog_posts", &Filters::new().any_of("id", post_ids))
            .await?
            .len();
    }

    let deleted = db
        .delete("categories", &Filters::new().eq("id", json!(id)))
        .await?;
    if deleted.is_empty() {
        return Err(ApiError::not_found("Category not found"));
    }

    Ok(ok(json!({ "deleted": true, "removed_posts": removed_posts })))
}
