use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthContext, Principal};
use crate::database::{DataClient, ScopedDataClient, StoreError};
use crate::error::ApiError;
use crate::filter::{Filters, SelectOptions};
use crate::handlers::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// POST /auth/register - create an identity-provider account plus the
/// application profile row for it.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<Value>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let session = state.identity.register(&payload.email, &payload.password).await?;

    // Create the application profile as the new principal itself, so the
    // insert runs under the same row-level policy as any other write
    let ctx = context_from(&session.user, &session.access_token);
    let db = ScopedDataClient::for_context(&ctx).await?;

    let display_name = payload
        .display_name
        .unwrap_or_else(|| payload.email.split('@').next().unwrap_or_default().to_string());

    let profile = match db
        .insert(
            "users",
            json!({
                "id": session.user.id,
                "email": session.user.email,
                "display_name": display_name,
                "role": "user",
            }),
        )
        .await
    {
        Ok(profile) => profile,
        // Identity already had a profile (e.g. repeated signup); fetch it
        Err(StoreError::Conflict(_)) => fetch_profile(&db, &session.user).await?,
        Err(e) => return Err(e.into()),
    };

    Ok(ok(json!({ "session": session, "profile": profile })))
}

/// POST /auth/login - exchange credentials for a session.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<Value>, ApiError> {
    let session = state.identity.login(&payload.email, &payload.password).await?;

    let ctx = context_from(&session.user, &session.access_token);
    let db = ScopedDataClient::for_context(&ctx).await?;
    // Missing profile is surfaced as data, not an error: the caller holds a
    // valid session either way
    let profile = db
        .select(
            "users",
            &["id", "email", "display_name", "role"],
            &Filters::new().eq("id", json!(session.user.id)),
            &SelectOptions::default(),
        )
        .await?
        .into_iter()
        .next();

    Ok(ok(json!({ "session": session, "profile": profile })))
}

fn context_from(principal: &Principal, token: &str) -> AuthContext {
    AuthContext {
        principal: principal.clone(),
        token: token.to_string(),
    }
}

async fn fetch_profile(db: &dyn DataClient, principal: &Principal) -> Result<Value, ApiError> {
    db.select(
        "users",
        &["id", "email", "display_name", "role"],
        &Filters::new().eq("id", json!(principal.id)),
        &SelectOptions::default(),
    )
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| ApiError::not_found("User profile not found"))
}
