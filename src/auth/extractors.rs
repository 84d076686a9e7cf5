//! Authentication extractors for Axum
//!
//! The `authenticate` middleware resolves a presented credential once per
//! request; these extractors pull the result out of request extensions so
//! handler signatures declare exactly the authorization level they need.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use super::gate::require_role;
use super::{AuthContext, AuthorizedPrincipal, Role};
use crate::database::ScopedDataClient;
use crate::error::ApiError;

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::authentication_required("Missing bearer credential"))
    }
}

/// Extractor that gates a route on the admin role.
///
/// Performs the stored-role lookup through a client scoped to the caller's own
/// credential, so the lookup is subject to the same row-level policy as any
/// other read. Handlers get the augmented principal; they never re-resolve it.
#[derive(Debug)]
pub struct AdminUser {
    pub context: AuthContext,
    pub principal: AuthorizedPrincipal,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AuthContext::from_request_parts(parts, state).await?;
        let db = ScopedDataClient::for_context(&ctx).await?;
        let principal = require_role(&db, &ctx, Role::Admin).await?;
        Ok(AdminUser {
            context: ctx,
            principal,
        })
    }
}
