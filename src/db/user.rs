/// User, credential and session database models
use crate::roles::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User profile record in the database
///
/// The role is stored as its raw string; it is parsed on use so that a
/// legacy or mistyped value resolves to an empty permission set instead of
/// failing the read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub rol: String,
    pub activo: bool,
    /// Credential id linked once the user registers
    pub auth_uid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.rol)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

/// Login credential record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Session record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub credential_id: String,
    pub email: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
