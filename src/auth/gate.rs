use serde_json::json;

use super::{AuthContext, AuthorizedPrincipal, Role};
use crate::database::DataClient;
use crate::error::ApiError;
use crate::filter::{Filters, SelectOptions};

/// Authorize a resolved principal for a required role.
///
/// The role comes from a fresh read of the caller's own `users` row through the
/// same scoped client as any other read, so the lookup itself is subject to
/// row-level policy (a principal can always read its own row).
///
/// Distinct failure states:
/// - no application user row → `NotFound` (identity exists, profile missing)
/// - role does not satisfy the requirement → `Forbidden`
pub async fn require_role(
    db: &dyn DataClient,
    ctx: &AuthContext,
    required: Role,
) -> Result<AuthorizedPrincipal, ApiError> {
    let rows = db
        .select(
            "users",
            &["id", "email", "role"],
            &Filters::new().eq("id", json!(ctx.principal.id)),
            &SelectOptions::default(),
        )
        .await?;

    let Some(row) = rows.first() else {
        return Err(ApiError::not_found("User profile not found"));
    };

    let role: Role = row
        .get("role")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .parse()
        .map_err(|e: String| {
            tracing::error!("unparseable role on user {}: {}", ctx.principal.id, e);
            ApiError::internal_server_error("Invalid user record")
        })?;

    if !role.satisfies(required) {
        return Err(ApiError::forbidden(format!(
            "Requires {} role",
            required.as_str()
        )));
    }

    Ok(AuthorizedPrincipal {
        id: ctx.principal.id,
        email: ctx.principal.email.clone(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::testing::MemoryStore;
    use uuid::Uuid;

    fn ctx(id: Uuid) -> AuthContext {
        AuthContext {
            principal: Principal {
                id,
                email: "reader@example.com".to_string(),
            },
            token: "tok".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_profile_is_not_found_not_forbidden() {
        let store = MemoryStore::new();
        let err = require_role(&store, &ctx(Uuid::new_v4()), Role::User)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn wrong_role_is_forbidden() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed(
            "users",
            json!({"id": id, "email": "reader@example.com", "role": "user"}),
        );
        let err = require_role(&store, &ctx(id), Role::Admin).await.unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn admin_satisfies_user_requirement() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed(
            "users",
            json!({"id": id, "email": "reader@example.com", "role": "admin"}),
        );
        let authorized = require_role(&store, &ctx(id), Role::User).await.unwrap();
        assert_eq!(authorized.role, Role::Admin);
        assert_eq!(authorized.id, id);
    }
}
