//! Authentication middleware for tenant routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use contta_shared::{Claims, JwtError, Role};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Validates the bearer token and stores its claims in the request
/// extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::new(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "Authorization header with Bearer token is required",
        )
        .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(JwtError::Expired) => {
            ApiError::new(StatusCode::UNAUTHORIZED, "token_expired", "Token has expired")
                .into_response()
        }
        Err(_) => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Invalid or malformed token",
        )
        .into_response(),
    }
}

/// What a handler is about to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read tenant data.
    Read,
    /// Create or change records.
    Write,
    /// Close a month.
    SignOff,
    /// Reopen a closed month.
    Reopen,
}

impl Access {
    const fn allows(self, role: Role) -> bool {
        match self {
            Self::Read => true,
            Self::Write => role.can_write(),
            Self::SignOff => role.can_sign_off(),
            Self::Reopen => role.can_reopen(),
        }
    }
}

/// Authenticated user claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.0.user_id()
    }

    /// Returns the tenant the token is scoped to.
    #[must_use]
    pub const fn tenant_id(&self) -> Uuid {
        self.0.tenant_id()
    }

    /// Returns the user's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Checks that the token belongs to `tenant_id` and its role allows
    /// `access`.
    ///
    /// # Errors
    ///
    /// Returns a 403 error otherwise.
    pub fn authorize(&self, tenant_id: Uuid, access: Access) -> Result<(), ApiError> {
        if self.tenant_id() != tenant_id {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "forbidden",
                "Token is not valid for this tenant",
            ));
        }
        if !access.allows(self.role()) {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "insufficient_role",
                format!("Role {} cannot perform this action", self.role()),
            ));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Authentication required",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn user(tenant_id: Uuid, role: Role) -> AuthUser {
        AuthUser(Claims::new(
            Uuid::new_v4(),
            tenant_id,
            role,
            Utc::now() + Duration::hours(1),
        ))
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_other_tenant_is_forbidden() {
        let auth = user(Uuid::new_v4(), Role::Owner);
        let err = auth.authorize(Uuid::new_v4(), Access::Read).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "forbidden");
    }

    #[rstest]
    #[case(Role::Viewer, Access::Read, true)]
    #[case(Role::Viewer, Access::Write, false)]
    #[case(Role::Assistant, Access::Write, true)]
    #[case(Role::Assistant, Access::SignOff, false)]
    #[case(Role::Accountant, Access::SignOff, true)]
    #[case(Role::Accountant, Access::Reopen, false)]
    #[case(Role::Admin, Access::Reopen, true)]
    #[case(Role::Owner, Access::Reopen, true)]
    fn test_role_access(#[case] role: Role, #[case] access: Access, #[case] allowed: bool) {
        let tenant_id = Uuid::new_v4();
        assert_eq!(user(tenant_id, role).authorize(tenant_id, access).is_ok(), allowed);
    }
}
