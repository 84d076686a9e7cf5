pub mod admin;
pub mod protected;
pub mod public;

use axum::response::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::AuthContext;
use crate::config;
use crate::database::ScopedDataClient;
use crate::error::ApiError;
use crate::filter::{OrderBy, SelectOptions};

/// Build the data client for this request: scoped to the caller's credential
/// when one was resolved, anonymous otherwise.
pub(crate) async fn scoped_client(ctx: Option<&AuthContext>) -> Result<ScopedDataClient, ApiError> {
    let client = match ctx {
        Some(ctx) => ScopedDataClient::for_context(ctx).await?,
        None => ScopedDataClient::anonymous().await?,
    };
    Ok(client)
}

pub(crate) fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Parse an order spec like "created_at desc" / "title". The column must be on
/// the endpoint's allow-list: order columns come from the client, and an
/// unknown column is bad input, not a composer-level programming error.
pub(crate) fn parse_order(spec: &str, allowed: &[&str]) -> Result<OrderBy, ApiError> {
    let mut it = spec.split_whitespace();
    let column = it
        .next()
        .ok_or_else(|| ApiError::bad_request("Empty order specification"))?;
    if !allowed.contains(&column) {
        return Err(ApiError::bad_request(format!("Cannot order by {}", column)));
    }
    let descending = it.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
    Ok(if descending {
        OrderBy::desc(column)
    } else {
        OrderBy::asc(column)
    })
}

/// Page window from query params, with the configured default page size.
/// Negative values are client errors here, before anything reaches the
/// composer.
pub(crate) fn page_options(
    order: Option<&str>,
    allowed_order: &[&str],
    limit: Option<i64>,
    offset: Option<i64>,
    default_order: OrderBy,
) -> Result<SelectOptions, ApiError> {
    if limit.is_some_and(|l| l < 0) {
        return Err(ApiError::bad_request("limit must be non-negative"));
    }
    if offset.is_some_and(|o| o < 0) {
        return Err(ApiError::bad_request("offset must be non-negative"));
    }
    let order = match order {
        Some(spec) => parse_order(spec, allowed_order)?,
        None => default_order,
    };
    Ok(SelectOptions {
        order: Some(order),
        limit: Some(limit.unwrap_or(config::config().query.default_limit)),
        offset: Some(offset.unwrap_or(0)),
    })
}
