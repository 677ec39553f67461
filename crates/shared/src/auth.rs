//! Authentication types: JWT claims and tenant roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user inside a tenant (bookkeeping office).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access.
    Owner,
    /// Full access, manages users and reopens closed months.
    Admin,
    /// Responsible accountant; signs off month-end closings.
    Accountant,
    /// Imports statements, classifies and reconciles.
    Assistant,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Returns true if this role can create or change records.
    #[must_use]
    pub const fn can_write(&self) -> bool {
        !matches!(self, Self::Viewer)
    }

    /// Returns true if this role can sign off a month-end closing.
    #[must_use]
    pub const fn can_sign_off(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Accountant)
    }

    /// Returns true if this role can reopen a closed month.
    #[must_use]
    pub const fn can_reopen(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Returns the lowercase name used in tokens and the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Accountant => "accountant",
            Self::Assistant => "assistant",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "accountant" => Ok(Self::Accountant),
            "assistant" => Ok(Self::Assistant),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// JWT claims carried by every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Tenant the token is scoped to.
    pub tenant: Uuid,
    /// User's role in the tenant.
    pub role: Role,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: Role, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            tenant: tenant_id,
            role,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the tenant ID from claims.
    #[must_use]
    pub const fn tenant_id(&self) -> Uuid {
        self.tenant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    #[test]
    fn test_role_permissions() {
        assert!(Role::Owner.can_sign_off());
        assert!(Role::Admin.can_sign_off());
        assert!(Role::Accountant.can_sign_off());
        assert!(!Role::Assistant.can_sign_off());
        assert!(!Role::Viewer.can_sign_off());

        assert!(Role::Owner.can_reopen());
        assert!(Role::Admin.can_reopen());
        assert!(!Role::Accountant.can_reopen());

        assert!(Role::Assistant.can_write());
        assert!(!Role::Viewer.can_write());
    }

    #[test]
    fn test_role_round_trips_through_strings() {
        for role in [
            Role::Owner,
            Role::Admin,
            Role::Accountant,
            Role::Assistant,
            Role::Viewer,
        ] {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
        assert!(Role::from_str("submitter").is_err());
    }

    #[test]
    fn test_claims_accessors() {
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::hours(1);

        let claims = Claims::new(user_id, tenant_id, Role::Accountant, expires_at);

        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.tenant_id(), tenant_id);
        assert_eq!(claims.exp, expires_at.timestamp());
        assert!(claims.iat <= Utc::now().timestamp());
    }
}
