use axum::extract::{Path, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AdminUser, Role};
use crate::database::{AdminDataClient, DataClient};
use crate::error::ApiError;
use crate::filter::{Filters, OrderBy};
use crate::handlers::{ok, page_options};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    /// Substring match on email, case-insensitive
    pub email: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/users - listing across all accounts, service credential.
pub async fn list_users(
    _admin: AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Value>, ApiError> {
    let db = AdminDataClient::connect().await?;

    let mut filters = Filters::new();
    if let Some(role) = &query.role {
        filters = filters.eq("role", json!(role));
    }
    if let Some(email) = &query.email {
        filters = filters.ilike("email", format!("%{}%", email));
    }

    let options = page_options(None, &[], query.limit, query.offset, OrderBy::asc("created_at"))?;
    let users = db
        .select(
            "users",
            &["id", "email", "display_name", "role", "created_at"],
            &filters,
            &options,
        )
        .await?;
    Ok(ok(users))
}

#[derive(Debug, Deserialize)]
pub struct SetRolePayload {
    pub role: String,
}

/// PATCH /api/admin/users/:id/role
///
/// Role changes apply to any user, so this runs on the service credential.
/// Admins cannot demote themselves; that could strand the site without one.
pub async fn set_role(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRolePayload>,
) -> Result<Json<Value>, ApiError> {
    let role: Role = payload
        .role
        .parse()
        .map_err(|_| ApiError::bad_request("Unknown role"))?;

    if id == admin.principal.id && role != Role::Admin {
        return Err(ApiError::bad_request("Cannot remove your own admin role"));
    }

    let db = AdminDataClient::connect().await?;
    let updated = db
        .update(
            "users",
            json!({ "role": role.as_str() }),
            &Filters::new().eq("id", json!(id)),
        )
        .await?;

    updated
        .into_iter()
        .next()
        .map(ok)
        .ok_or_else(|| ApiError::not_found("User profile not found"))
}
