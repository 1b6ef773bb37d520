/// Role and permission table
///
/// Static mapping from role to capability set. Permissions are resolved from
/// the role alone; there are no per-user overrides. Unknown roles or
/// permissions degrade to "denied", never to an error.
use serde::{Deserialize, Serialize};

/// System roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Quick-validation desk only
    Validador,
    /// Member management without deletion or user administration
    Gestor,
    /// Most capabilities, read-only over user administration
    Admin,
    /// Full access, including user administration
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Validador => "validador",
            Role::Gestor => "gestor",
        }
    }

    /// Parse a stored role string. Unknown values yield `None` so that a
    /// mistyped or legacy role resolves to an empty permission set instead of
    /// failing the request.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "validador" => Some(Role::Validador),
            "gestor" => Some(Role::Gestor),
            _ => None,
        }
    }

    /// Display label shown to operators
    pub fn label(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Administrador",
            Role::Admin => "Administrador",
            Role::Validador => "Validador",
            Role::Gestor => "Gestor de Socios",
        }
    }

    /// Fixed hierarchy ranking, used only for user edit/delete eligibility
    fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::Validador | Role::Gestor => 1,
        }
    }

    /// Whether this actor may edit or delete a user holding `target`
    pub fn can_manage(&self, target: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            _ => self.rank() > target.rank(),
        }
    }
}

/// Permission identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    DashboardView,
    SociosView,
    SociosCreate,
    SociosEdit,
    SociosDelete,
    ValidacionView,
    ValidacionEdit,
    ReportesView,
    ReportesExport,
    ConfigView,
    ConfigEdit,
    UsersView,
    UsersCreate,
    UsersEdit,
    UsersDelete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DashboardView => "dashboard_view",
            Permission::SociosView => "socios_view",
            Permission::SociosCreate => "socios_create",
            Permission::SociosEdit => "socios_edit",
            Permission::SociosDelete => "socios_delete",
            Permission::ValidacionView => "validacion_view",
            Permission::ValidacionEdit => "validacion_edit",
            Permission::ReportesView => "reportes_view",
            Permission::ReportesExport => "reportes_export",
            Permission::ConfigView => "config_view",
            Permission::ConfigEdit => "config_edit",
            Permission::UsersView => "users_view",
            Permission::UsersCreate => "users_create",
            Permission::UsersEdit => "users_edit",
            Permission::UsersDelete => "users_delete",
        }
    }
}

/// Ordered permission set for a role. Deterministic and stable across calls.
pub fn permissions_for(role: Option<Role>) -> &'static [Permission] {
    use Permission::*;

    match role {
        Some(Role::SuperAdmin) => &[
            DashboardView,
            SociosView,
            SociosCreate,
            SociosEdit,
            SociosDelete,
            ValidacionView,
            ValidacionEdit,
            ReportesView,
            ReportesExport,
            ConfigView,
            ConfigEdit,
            UsersView,
            UsersCreate,
            UsersEdit,
            UsersDelete,
        ],
        Some(Role::Admin) => &[
            DashboardView,
            SociosView,
            SociosCreate,
            SociosEdit,
            SociosDelete,
            ValidacionView,
            ValidacionEdit,
            ReportesView,
            ReportesExport,
            ConfigView,
            UsersView,
        ],
        Some(Role::Gestor) => &[
            DashboardView,
            SociosView,
            SociosCreate,
            SociosEdit,
            ValidacionView,
        ],
        Some(Role::Validador) => &[ValidacionView, ValidacionEdit],
        None => &[],
    }
}

/// Check a single permission. False on a missing role.
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// Whether the role is the super administrator
pub fn is_super_admin(role: Option<Role>) -> bool {
    role == Some(Role::SuperAdmin)
}

/// Whether the role is an administrator (or higher)
pub fn is_admin(role: Option<Role>) -> bool {
    matches!(role, Some(Role::Admin) | Some(Role::SuperAdmin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_deterministic() {
        for role in [Role::SuperAdmin, Role::Admin, Role::Validador, Role::Gestor] {
            assert_eq!(permissions_for(Some(role)), permissions_for(Some(role)));
        }
    }

    #[test]
    fn test_unknown_role_resolves_empty() {
        assert!(Role::parse("invitado").is_none());
        assert!(permissions_for(None).is_empty());
        assert!(!has_permission(None, Permission::SociosView));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("validador"), Some(Role::Validador));
        assert_eq!(Role::parse("gestor"), Some(Role::Gestor));
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::SuperAdmin.can_manage(Role::Admin));
        assert!(Role::SuperAdmin.can_manage(Role::SuperAdmin));
        assert!(Role::Admin.can_manage(Role::Gestor));
        assert!(Role::Admin.can_manage(Role::Validador));

        assert!(!Role::Admin.can_manage(Role::Admin));
        assert!(!Role::Admin.can_manage(Role::SuperAdmin));
        assert!(!Role::Gestor.can_manage(Role::Validador));
    }

    #[test]
    fn test_gestor_cannot_delete_socios() {
        assert!(has_permission(Some(Role::Gestor), Permission::SociosCreate));
        assert!(!has_permission(Some(Role::Gestor), Permission::SociosDelete));
        assert!(!has_permission(Some(Role::Gestor), Permission::UsersView));
    }

    #[test]
    fn test_validador_scope() {
        let perms = permissions_for(Some(Role::Validador));
        assert_eq!(
            perms,
            &[Permission::ValidacionView, Permission::ValidacionEdit]
        );
        assert!(!has_permission(Some(Role::Validador), Permission::DashboardView));
    }

    #[test]
    fn test_admin_predicates() {
        assert!(is_admin(Some(Role::SuperAdmin)));
        assert!(is_admin(Some(Role::Admin)));
        assert!(!is_admin(Some(Role::Gestor)));
        assert!(is_super_admin(Some(Role::SuperAdmin)));
        assert!(!is_super_admin(Some(Role::Admin)));
        assert!(!is_super_admin(None));
    }
}
