use serde_json::json;
use sqlx::{Postgres, Transaction};

use super::error::{classify, StoreError};
use crate::auth::AuthContext;
use crate::config;
use crate::filter::compose::is_valid_identifier;
use uuid::Uuid;

/// The identity a data client carries on every operation.
///
/// Exactly one of: a resolved caller principal, no principal (public access), or
/// the service credential. Bound per-transaction so row-level policies always
/// see the identity of the request that issued the query.
#[derive(Debug, Clone)]
pub enum Credential {
    Anonymous,
    Principal { id: Uuid, email: String },
    Service,
}

impl Credential {
    pub fn from_context(ctx: &AuthContext) -> Self {
        Credential::Principal {
            id: ctx.principal.id,
            email: ctx.principal.email.clone(),
        }
    }

    /// Bind this credential onto a transaction before any statement runs.
    ///
    /// `SET LOCAL ROLE` swaps to the policy-restricted role and
    /// `request.jwt.claims` carries the principal for policies that key on
    /// `current_setting('request.jwt.claims', true)`. The service credential
    /// binds nothing: its connection role bypasses row-level security.
    pub async fn bind(&self, tx: &mut Transaction<'_, Postgres>) -> Result<(), StoreError> {
        let db = &config::config().database;
        match self {
            Credential::Service => Ok(()),
            Credential::Anonymous => {
                set_local_role(tx, &db.anonymous_role).await?;
                set_claims(tx, json!({ "role": db.anonymous_role }).to_string()).await
            }
            Credential::Principal { id, email } => {
                set_local_role(tx, &db.authenticated_role).await?;
                set_claims(
                    tx,
                    json!({
                        "sub": id,
                        "email": email,
                        "role": db.authenticated_role,
                    })
                    .to_string(),
                )
                .await
            }
        }
    }
}

async fn set_local_role(tx: &mut Transaction<'_, Postgres>, role: &str) -> Result<(), StoreError> {
    // Role names cannot be parameterized; validated as identifiers instead
    if !is_valid_identifier(role) {
        return Err(StoreError::MalformedQuery(format!("invalid role name: {}", role)));
    }
    sqlx::query(&format!("SET LOCAL ROLE \"{}\"", role))
        .execute(&mut **tx)
        .await
        .map_err(classify)?;
    Ok(())
}

async fn set_claims(tx: &mut Transaction<'_, Postgres>, claims: String) -> Result<(), StoreError> {
    sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
        .bind(claims)
        .execute(&mut **tx)
        .await
        .map_err(classify)?;
    Ok(())
}
