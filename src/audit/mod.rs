/// Activity audit pipeline
///
/// Append-only recording of who did what, where, and with what outcome.
/// Entries are immutable: nothing in this module updates or deletes a
/// persisted record.

mod logger;

pub use logger::AuditLogger;

use crate::db::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Auditable action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    // Authentication
    LoginSuccess,
    LoginFailed,
    Logout,
    Register,
    // Socios
    SearchSocios,
    CreateSocio,
    EditSocio,
    DeleteSocio,
    ViewSocio,
    ImportSocios,
    // Quick validation
    SearchValidacion,
    ViewSocioDetails,
    // Reports
    GenerateReport,
    ExportData,
    // Users
    CreateUser,
    EditUser,
    ChangeUserRole,
    ToggleUserStatus,
    // Navigation
    NavigateToPage,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LoginSuccess => "LOGIN_SUCCESS",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Register => "REGISTER",
            AuditAction::SearchSocios => "SEARCH_SOCIOS",
            AuditAction::CreateSocio => "CREATE_SOCIO",
            AuditAction::EditSocio => "EDIT_SOCIO",
            AuditAction::DeleteSocio => "DELETE_SOCIO",
            AuditAction::ViewSocio => "VIEW_SOCIO",
            AuditAction::ImportSocios => "IMPORT_SOCIOS",
            AuditAction::SearchValidacion => "SEARCH_VALIDACION",
            AuditAction::ViewSocioDetails => "VIEW_SOCIO_DETAILS",
            AuditAction::GenerateReport => "GENERATE_REPORT",
            AuditAction::ExportData => "EXPORT_DATA",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::EditUser => "EDIT_USER",
            AuditAction::ChangeUserRole => "CHANGE_USER_ROLE",
            AuditAction::ToggleUserStatus => "TOGGLE_USER_STATUS",
            AuditAction::NavigateToPage => "NAVIGATE_TO_PAGE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOGIN_SUCCESS" => Some(AuditAction::LoginSuccess),
            "LOGIN_FAILED" => Some(AuditAction::LoginFailed),
            "LOGOUT" => Some(AuditAction::Logout),
            "REGISTER" => Some(AuditAction::Register),
            "SEARCH_SOCIOS" => Some(AuditAction::SearchSocios),
            "CREATE_SOCIO" => Some(AuditAction::CreateSocio),
            "EDIT_SOCIO" => Some(AuditAction::EditSocio),
            "DELETE_SOCIO" => Some(AuditAction::DeleteSocio),
            "VIEW_SOCIO" => Some(AuditAction::ViewSocio),
            "IMPORT_SOCIOS" => Some(AuditAction::ImportSocios),
            "SEARCH_VALIDACION" => Some(AuditAction::SearchValidacion),
            "VIEW_SOCIO_DETAILS" => Some(AuditAction::ViewSocioDetails),
            "GENERATE_REPORT" => Some(AuditAction::GenerateReport),
            "EXPORT_DATA" => Some(AuditAction::ExportData),
            "CREATE_USER" => Some(AuditAction::CreateUser),
            "EDIT_USER" => Some(AuditAction::EditUser),
            "CHANGE_USER_ROLE" => Some(AuditAction::ChangeUserRole),
            "TOGGLE_USER_STATUS" => Some(AuditAction::ToggleUserStatus),
            "NAVIGATE_TO_PAGE" => Some(AuditAction::NavigateToPage),
            _ => None,
        }
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::LoginSuccess => "Inicio de sesión exitoso",
            AuditAction::LoginFailed => "Intento de inicio de sesión fallido",
            AuditAction::Logout => "Cierre de sesión",
            AuditAction::Register => "Registro de usuario",
            AuditAction::SearchSocios => "Búsqueda de socios",
            AuditAction::CreateSocio => "Crear socio",
            AuditAction::EditSocio => "Editar socio",
            AuditAction::DeleteSocio => "Eliminar socio",
            AuditAction::ViewSocio => "Ver socio",
            AuditAction::ImportSocios => "Importar socios",
            AuditAction::SearchValidacion => "Búsqueda en validación",
            AuditAction::ViewSocioDetails => "Ver detalles de socio",
            AuditAction::GenerateReport => "Generar reporte",
            AuditAction::ExportData => "Exportar datos",
            AuditAction::CreateUser => "Crear usuario",
            AuditAction::EditUser => "Editar usuario",
            AuditAction::ChangeUserRole => "Cambiar rol de usuario",
            AuditAction::ToggleUserStatus => "Activar/desactivar usuario",
            AuditAction::NavigateToPage => "Navegar a página",
        }
    }

    /// Whether this action can open an activity session
    pub fn opens_session(&self) -> bool {
        matches!(self, AuditAction::LoginSuccess | AuditAction::NavigateToPage)
    }
}

/// Who performed the action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorInfo {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_role: String,
}

impl ActorInfo {
    /// Actor for a request with no resolvable identity (e.g. failed login)
    pub fn unknown(email: Option<String>) -> Self {
        Self {
            user_id: None,
            user_name: email.clone(),
            user_email: email,
            user_role: "unknown".to_string(),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: Some(user.id.clone()),
            user_email: Some(user.email.clone()),
            user_name: Some(user.display_name()),
            user_role: user.rol.clone(),
        }
    }
}

/// Where the action happened, as reported by the client request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub page: String,
    pub url: String,
    pub user_agent: Option<String>,
    pub language: Option<String>,
    pub platform: Option<String>,
    pub screen_resolution: Option<String>,
}

/// A persisted audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_role: String,
    pub action: String,
    pub action_label: String,
    pub details: serde_json::Value,
    pub page: String,
    pub url: String,
    pub user_agent: Option<String>,
    pub language: Option<String>,
    pub platform: Option<String>,
    pub screen_resolution: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Read-side filters; every field is optional and they compose
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilters {
    pub user_email: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub action: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive: extended to the end of its day
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Per-user activity statistics over an audit window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_actions: usize,
    pub sessions: usize,
    pub total_session_seconds: i64,
    pub last_activity: Option<DateTime<Utc>>,
    pub actions_by_type: BTreeMap<String, usize>,
}

/// A user whose latest entry is older than the inactivity threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactiveUser {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub minutes_since_last_activity: i64,
}
