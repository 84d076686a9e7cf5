pub mod extract;
pub mod extractors;
pub mod gate;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use extractors::AdminUser;

/// Application-level authorization role, stored on the caller's own `users`
/// row. Never taken from token claims: the token is a provider identity token,
/// and role can change between issuance and use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Admin satisfies any requirement; user satisfies only user.
    pub fn satisfies(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            (Role::User, Role::Admin) => false,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// An authenticated identity as resolved by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// Request context produced by the auth middleware: the resolved principal plus
/// the bearer credential it was resolved from. Attached once per request and
/// threaded into data clients; downstream handlers never re-resolve.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
    pub token: String,
}

/// A principal augmented with its stored application role, produced by the role
/// gate after a fresh read of the caller's `users` row.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizedPrincipal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::User.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("moderator".parse::<Role>().is_err());
    }
}
