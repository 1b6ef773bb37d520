/// Auth session management
///
/// Bridges login credentials with the domain User profile: a credential
/// authenticates, the matching profile (looked up by email) determines the
/// permission set.

mod manager;

pub use manager::SessionManager;

use crate::{db::user::User, roles::Permission};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-registration request (allow-list gated)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Session response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub email: String,
    pub access_jwt: String,
    /// Matching profile, when one exists
    pub user: Option<User>,
    pub permissions: Vec<Permission>,
}

/// Session info (for get-session)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub email: String,
    pub user: Option<User>,
    pub permissions: Vec<Permission>,
}

/// Validated session from bearer token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub session_id: String,
    pub credential_id: String,
    pub email: String,
}
