use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::auth::AuthContext;
use crate::database::{DataClient, ScopedDataClient};
use crate::error::ApiError;
use crate::filter::{Filters, SelectOptions};
use crate::handlers::ok;

/// GET /api/me - the caller's own application profile.
pub async fn me(ctx: AuthContext) -> Result<Json<Value>, ApiError> {
    let db = ScopedDataClient::for_context(&ctx).await?;
    let profile = db
        .select(
            "users",
            &["id", "email", "display_name", "bio", "role", "created_at"],
            &Filters::new().eq("id", json!(ctx.principal.id)),
            &SelectOptions::default(),
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;
    Ok(ok(profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfilePayload {
    pub display_name: Option<String>,
    pub bio: Option<Option<String>>,
}

/// PATCH /api/me
///
/// Only presentation fields are writable here. Email belongs to the identity
/// provider and role changes go through the admin surface.
pub async fn update_me(
    ctx: AuthContext,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<Value>, ApiError> {
    let mut patch = Map::new();
    if let Some(display_name) = payload.display_name {
        if display_name.trim().is_empty() {
            return Err(ApiError::bad_request("Display name cannot be empty"));
        }
        patch.insert("display_name".to_string(), json!(display_name));
    }
    if let Some(bio) = payload.bio {
        patch.insert("bio".to_string(), json!(bio));
    }
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let db = ScopedDataClient::for_context(&ctx).await?;
    let updated = db
        .update(
            "users",
            Value::Object(patch),
            &Filters::new().eq("id", json!(ctx.principal.id)),
        )
        .await?;

    updated
        .into_iter()
        .next()
        .map(ok)
        .ok_or_else(|| ApiError::not_found("User profile not found"))
}
