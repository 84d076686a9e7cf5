use axum::extract::{Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::database::DataClient;
use crate::error::ApiError;
use crate::filter::{Filters, OrderBy, SelectOptions};
use crate::handlers::{ok, page_options, scoped_client};

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub status: Option<String>,
    /// Substring search on title, case-insensitive
    pub search: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/posts - list posts visible to the caller.
///
/// Anonymous callers see exactly what the public row-level policy exposes; an
/// authenticated caller additionally sees their own unpublished drafts. The
/// handler never filters on visibility itself.
pub async fn list_posts(
    ctx: Option<AuthContext>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Value>, ApiError> {
    let mut filters = Filters::new();
    if let Some(category_id) = query.category_id {
        filters = filters.eq("category_id", json!(category_id));
    }
    if let Some(author_id) = query.author_id {
        filters = filters.eq("author_id", json!(author_id));
    }
    if let Some(status) = &query.status {
        filters = filters.eq("status", json!(status));
    }
    if let Some(search) = &query.search {
        filters = filters.ilike("title", format!("%{}%", search));
    }

    // Validate client input before touching the store
    let options = page_options(
        query.order.as_deref(),
        &["created_at", "updated_at", "title", "likes"],
        query.limit,
        query.offset,
        OrderBy::desc("created_at"),
    )?;

    let db = scoped_client(ctx.as_ref()).await?;
    let posts = db.select("blog_posts", &[], &filters, &options).await?;
    Ok(ok(posts))
}

/// GET /api/posts/:id
pub async fn get_post(
    ctx: Option<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let db = scoped_client(ctx.as_ref()).await?;
    let post = db
        .select(
            "blog_posts",
            &[],
            &Filters::new().eq("id", json!(id)),
            &SelectOptions::default(),
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(ok(post))
}

#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/posts/:id/comments - oldest first.
pub async fn list_comments(
    ctx: Option<AuthContext>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<ListCommentsQuery>,
) -> Result<Json<Value>, ApiError> {
    let db = scoped_client(ctx.as_ref()).await?;

    // A policy-hidden post and a missing post look the same: no comments
    let post_visible = !db
        .select(
            "blog_posts",
            &["id"],
            &Filters::new().eq("id", json!(post_id)),
            &SelectOptions::default(),
        )
        .await?
        .is_empty();
    if !post_visible {
        return Err(ApiError::not_found("Post not found"));
    }

    let options = page_options(None, &[], query.limit, query.offset, OrderBy::asc("created_at"))?;
    let comments = db
        .select(
            "comments",
            &[],
            &Filters::new().eq("post_id", json!(post_id)),
            &options,
        )
        .await?;
    Ok(ok(comments))
}

/// GET /api/categories
pub async fn list_categories(ctx: Option<AuthContext>) -> Result<Json<Value>, ApiError> {
    let db = scoped_client(ctx.as_ref()).await?;
    let categories = db
        .select(
            "categories",
            &[],
            &Filters::new(),
            &SelectOptions::default().order_by(OrderBy::asc("name")),
        )
        .await?;
    Ok(ok(categories))
}
