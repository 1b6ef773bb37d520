/// Authentication extractors and utilities
use crate::{
    account::ValidatedSession,
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::user::User,
    error::AppError,
    roles::{self, Permission, Role},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - validates the session and re-resolves the profile
/// and permission set on every request, so role edits and deactivations take
/// effect without a new login
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: ValidatedSession,
    pub user: Option<User>,
    pub permissions: Vec<Permission>,
}

impl AuthContext {
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().and_then(|u| u.role())
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is_admin(&self) -> bool {
        roles::is_admin(self.role())
    }

    pub fn is_super_admin(&self) -> bool {
        roles::is_super_admin(self.role())
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Extract bearer token from Authorization header
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        // Validate token
        let session = state.session_manager.validate_access_token(&token).await?;

        // Re-resolve profile and permissions for this request
        let (user, permissions) = state.session_manager.resolve(&session.email).await?;

        Ok(AuthContext {
            session,
            user,
            permissions,
        })
    }
}

/// Macro to require a permission on an authenticated context
/// Usage: require_permission!(auth, Permission::SociosView);
#[macro_export]
macro_rules! require_permission {
    ($auth:expr, $permission:expr) => {
        if !$auth.has_permission($permission) {
            return Err($crate::error::AppError::Authorization(format!(
                "Requires {} permission",
                $permission.as_str()
            )));
        }
    };
}
