/// Operator ("usuario") domain
///
/// Users are the people who run the system, as opposed to the socios they
/// manage. Users are never hard-deleted; deactivation keeps the audit trail
/// attributable.

mod repository;

pub use repository::UserRepository;

use crate::roles::Role;
use serde::{Deserialize, Serialize};

/// Payload for creating a user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NuevoUsuario {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub rol: Role,
}

/// Partial update with merge semantics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioUpdate {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
}

/// Answer to "may this email self-register?"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistroAutorizado {
    pub authorized: bool,
    pub role: Option<String>,
    pub user_id: Option<String>,
    pub has_auth_account: bool,
}
