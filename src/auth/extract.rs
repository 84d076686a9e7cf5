use axum::http::HeaderMap;

/// Pull a bearer token out of the Authorization header.
///
/// Pure: returns `Some(token)` only for `Bearer <non-empty>`; every other shape
/// (absent header, wrong scheme, empty token, non-UTF8) is `None`. Distinguishing
/// "absent" from "invalid" happens upstream at the middleware.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?;

    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
