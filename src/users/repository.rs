/// User repository backed by the shared SQLite pool
use crate::{
    db::user::User,
    error::{AppError, AppResult},
    roles::Role,
    users::{NuevoUsuario, RegistroAutorizado, UsuarioUpdate},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::ValidateEmail;

const USER_COLUMNS: &str =
    "id, nombre, apellido, email, rol, activo, auth_uid, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct UserRepository {
    db: SqlitePool,
}

impl UserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All users, newest first
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Get a user by id; None when missing
    pub async fn get(&self, id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Get a user by email (the unique lookup key for sessions)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Active users holding a role, newest first
    pub async fn by_role(&self, role: Role) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE rol = ?1 AND activo = 1 ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .bind(role.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Active users, newest first
    pub async fn active(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE activo = 1 ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Create a user profile
    pub async fn create(&self, nuevo: NuevoUsuario) -> AppResult<User> {
        if !ValidateEmail::validate_email(&nuevo.email) {
            return Err(AppError::Validation(format!(
                "Email \"{}\" no es válido",
                nuevo.email
            )));
        }

        if self.email_exists(&nuevo.email).await? {
            return Err(AppError::Conflict(format!(
                "Email {} ya está registrado",
                nuevo.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            nombre: nuevo.nombre,
            apellido: nuevo.apellido,
            email: nuevo.email,
            rol: nuevo.rol.as_str().to_string(),
            activo: true,
            auth_uid: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        sqlx::query(
            "INSERT INTO users (id, nombre, apellido, email, rol, activo, auth_uid, \
             created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&user.id)
        .bind(&user.nombre)
        .bind(&user.apellido)
        .bind(&user.email)
        .bind(&user.rol)
        .bind(user.activo)
        .bind(&user.auth_uid)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(&self.db)
        .await?;

        Ok(user)
    }

    /// Update profile fields with merge semantics, stamping updated_at
    pub async fn update(&self, id: &str, cambios: UsuarioUpdate) -> AppResult<User> {
        let mut user = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;

        if let Some(nombre) = cambios.nombre {
            user.nombre = nombre;
        }
        if let Some(apellido) = cambios.apellido {
            user.apellido = apellido;
        }
        if let Some(email) = cambios.email {
            if !ValidateEmail::validate_email(&email) {
                return Err(AppError::Validation(format!("Email \"{}\" no es válido", email)));
            }
            user.email = email;
        }
        user.updated_at = Utc::now();

        sqlx::query(
            "UPDATE users SET nombre = ?1, apellido = ?2, email = ?3, updated_at = ?4 \
             WHERE id = ?5",
        )
        .bind(&user.nombre)
        .bind(&user.apellido)
        .bind(&user.email)
        .bind(user.updated_at)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(user)
    }

    /// Soft delete: flag inactive and stamp deleted_at. The row stays for
    /// audit attribution.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE users SET activo = 0, deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
        )
        .bind(now)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Usuario {} no encontrado", id)));
        }

        Ok(())
    }

    /// Toggle the active flag
    pub async fn toggle_activo(&self, id: &str, activo: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET activo = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(activo)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Usuario {} no encontrado", id)));
        }

        Ok(())
    }

    /// Change the user's role
    pub async fn change_rol(&self, id: &str, rol: Role) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET rol = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(rol.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Usuario {} no encontrado", id)));
        }

        Ok(())
    }

    /// Record which credential this profile belongs to
    pub async fn link_auth_uid(&self, id: &str, auth_uid: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET auth_uid = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(auth_uid)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Registration allow-list check: an email may self-register only when a
    /// profile already exists for it and has no linked credential yet
    pub async fn registro_autorizado(&self, email: &str) -> AppResult<RegistroAutorizado> {
        match self.get_by_email(email).await? {
            Some(user) => Ok(RegistroAutorizado {
                authorized: true,
                role: Some(user.rol.clone()),
                user_id: Some(user.id),
                has_auth_account: user.auth_uid.is_some(),
            }),
            None => Ok(RegistroAutorizado {
                authorized: false,
                role: None,
                user_id: None,
                has_auth_account: false,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_pool() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY,
                nombre TEXT NOT NULL,
                apellido TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                rol TEXT NOT NULL,
                activo INTEGER NOT NULL DEFAULT 1,
                auth_uid TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    fn nuevo(email: &str, rol: Role) -> NuevoUsuario {
        NuevoUsuario {
            nombre: "Ana".to_string(),
            apellido: "Prueba".to_string(),
            email: email.to_string(),
            rol,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = UserRepository::new(memory_pool().await);

        let user = repo.create(nuevo("ana@opm.org", Role::Gestor)).await.unwrap();
        assert!(user.activo);
        assert_eq!(user.role(), Some(Role::Gestor));

        let by_email = repo.get_by_email("ana@opm.org").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(repo.get_by_email("nadie@opm.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = UserRepository::new(memory_pool().await);
        repo.create(nuevo("ana@opm.org", Role::Gestor)).await.unwrap();

        let err = repo.create(nuevo("ana@opm.org", Role::Admin)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let repo = UserRepository::new(memory_pool().await);
        let err = repo.create(nuevo("sin-arroba", Role::Gestor)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row() {
        let repo = UserRepository::new(memory_pool().await);
        let user = repo.create(nuevo("ana@opm.org", Role::Gestor)).await.unwrap();

        repo.delete(&user.id).await.unwrap();

        let still_there = repo.get(&user.id).await.unwrap().unwrap();
        assert!(!still_there.activo);
        assert!(still_there.deleted_at.is_some());
        assert!(repo.active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_change_rol_and_toggle() {
        let repo = UserRepository::new(memory_pool().await);
        let user = repo.create(nuevo("ana@opm.org", Role::Gestor)).await.unwrap();

        repo.change_rol(&user.id, Role::Admin).await.unwrap();
        assert_eq!(
            repo.get(&user.id).await.unwrap().unwrap().role(),
            Some(Role::Admin)
        );

        repo.toggle_activo(&user.id, false).await.unwrap();
        assert!(!repo.get(&user.id).await.unwrap().unwrap().activo);

        let admins = repo.by_role(Role::Admin).await.unwrap();
        assert!(admins.is_empty()); // inactive users are excluded
    }

    #[tokio::test]
    async fn test_registro_autorizado() {
        let repo = UserRepository::new(memory_pool().await);
        let user = repo.create(nuevo("ana@opm.org", Role::Gestor)).await.unwrap();

        let auth = repo.registro_autorizado("ana@opm.org").await.unwrap();
        assert!(auth.authorized);
        assert!(!auth.has_auth_account);
        assert_eq!(auth.role.as_deref(), Some("gestor"));

        repo.link_auth_uid(&user.id, "cred-1").await.unwrap();
        let auth = repo.registro_autorizado("ana@opm.org").await.unwrap();
        assert!(auth.has_auth_account);

        let no_auth = repo.registro_autorizado("intruso@opm.org").await.unwrap();
        assert!(!no_auth.authorized);
    }
}
