use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::extract::bearer_token;
use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Authentication middleware, applied to the whole app.
///
/// When a credential is presented it is resolved against the identity provider
/// and the resulting [`AuthContext`] is attached to the request; route-level
/// extractors then decide whether a context is required. No Authorization
/// header is fine here (public routes allow anonymous access), but a presented
/// credential that does not resolve fails closed before any handler runs,
/// rather than silently downgrading the caller to anonymous.
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if headers.contains_key("authorization") {
        let token = bearer_token(&headers)
            .ok_or_else(|| ApiError::authentication_required("Malformed bearer credential"))?;
        let principal = state.identity.resolve(&token).await?;
        request.extensions_mut().insert(AuthContext { principal, token });
    }
    Ok(next.run(request).await)
}
