/// Session manager implementation using runtime queries
use crate::{
    account::{SessionResponse, ValidatedSession},
    audit::{ActorInfo, AuditAction, AuditLogger, RequestContext},
    config::ServerConfig,
    db::user::{Credential, Session, User},
    error::{AppError, AppResult},
    roles::{permissions_for, Permission},
    users::UserRepository,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Session manager service
pub struct SessionManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    users: UserRepository,
    audit: AuditLogger,
}

impl SessionManager {
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        users: UserRepository,
        audit: AuditLogger,
    ) -> Self {
        Self {
            db,
            config,
            users,
            audit,
        }
    }

    /// Authenticate and open a session.
    ///
    /// A missing profile does not fail the login; the session simply carries
    /// an empty permission set. Exactly one audit entry is written for
    /// success and one for failure; failures never reveal which factor was
    /// wrong and never include the password.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> AppResult<SessionResponse> {
        let credential = match self.get_credential(email).await? {
            Some(credential) => credential,
            None => {
                self.record_login_failure(email, ctx).await;
                return Err(AppError::Authentication("Invalid credentials".to_string()));
            }
        };

        if !verify_password(password, &credential.password_hash) {
            self.record_login_failure(email, ctx).await;
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&credential).await?;
        let (user, permissions) = self.resolve(email).await?;

        let actor = user
            .as_ref()
            .map(ActorInfo::from_user)
            .unwrap_or_else(|| ActorInfo::unknown(Some(email.to_string())));
        self.audit
            .record(AuditAction::LoginSuccess, &actor, json!({}), ctx)
            .await;

        Ok(SessionResponse {
            email: credential.email,
            access_jwt: session.access_token,
            user,
            permissions,
        })
    }

    /// Close a session: audit first, then drop the session row
    pub async fn logout(&self, session: &ValidatedSession, ctx: &RequestContext) -> AppResult<()> {
        let (user, _) = self.resolve(&session.email).await?;
        let actor = user
            .as_ref()
            .map(ActorInfo::from_user)
            .unwrap_or_else(|| ActorInfo::unknown(Some(session.email.clone())));
        self.audit
            .record(AuditAction::Logout, &actor, json!({}), ctx)
            .await;

        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(&session.session_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Allow-list gated self-registration: the email must already have a
    /// profile without a linked credential
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> AppResult<()> {
        let autorizado = self.users.registro_autorizado(email).await?;
        if !autorizado.authorized {
            return Err(AppError::Authorization(
                "Email no autorizado para registrarse".to_string(),
            ));
        }
        if autorizado.has_auth_account {
            return Err(AppError::Conflict(
                "El email ya tiene una cuenta creada".to_string(),
            ));
        }

        let credential = Credential {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO credentials (id, email, password_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&credential.id)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.created_at)
        .execute(&self.db)
        .await?;

        if let Some(user_id) = autorizado.user_id {
            self.users.link_auth_uid(&user_id, &credential.id).await?;
        }

        let (user, _) = self.resolve(email).await?;
        let actor = user
            .as_ref()
            .map(ActorInfo::from_user)
            .unwrap_or_else(|| ActorInfo::unknown(Some(email.to_string())));
        self.audit
            .record(AuditAction::Register, &actor, json!({}), ctx)
            .await;

        Ok(())
    }

    /// Validate a bearer token and return the session it belongs to
    pub async fn validate_access_token(&self, token: &str) -> AppResult<ValidatedSession> {
        let row = sqlx::query(
            "SELECT id, credential_id, email, expires_at FROM sessions WHERE access_token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid or expired session".to_string()))?;

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if Utc::now() > expires_at {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            session_id: row.get("id"),
            credential_id: row.get("credential_id"),
            email: row.get("email"),
        })
    }

    /// Re-resolve the profile and permission set for an email.
    ///
    /// This runs on every authenticated request, so a role change or
    /// deactivation takes effect on the user's next action without a new
    /// login. An absent or inactive profile resolves to no permissions.
    pub async fn resolve(&self, email: &str) -> AppResult<(Option<User>, Vec<Permission>)> {
        let user = self.users.get_by_email(email).await?;
        let permissions = resolve_permissions(user.as_ref());
        Ok((user, permissions))
    }

    async fn create_session(&self, credential: &Credential) -> AppResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let access_token = self.generate_access_token(&credential.email, &session_id)?;

        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.authentication.session_ttl_hours);

        sqlx::query(
            "INSERT INTO sessions (id, credential_id, email, access_token, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&session_id)
        .bind(&credential.id)
        .bind(&credential.email)
        .bind(&access_token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(Session {
            id: session_id,
            credential_id: credential.id.clone(),
            email: credential.email.clone(),
            access_token,
            created_at: now,
            expires_at,
        })
    }

    async fn get_credential(&self, email: &str) -> AppResult<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT id, email, password_hash, created_at FROM credentials WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(credential)
    }

    async fn record_login_failure(&self, email: &str, ctx: &RequestContext) {
        self.audit
            .record_outcome(
                AuditAction::LoginFailed,
                &ActorInfo::unknown(Some(email.to_string())),
                json!({}),
                ctx,
                false,
                Some("Invalid credentials".to_string()),
            )
            .await;
    }

    fn generate_access_token(&self, email: &str, session_id: &str) -> AppResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Serialize, Deserialize)]
        struct Claims {
            sub: String,
            sid: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: email.to_string(),
            sid: session_id.to_string(),
            iat: now,
            exp: now + self.config.authentication.session_ttl_hours * 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }
}

/// Permission set for a profile: empty when there is no profile or the
/// profile is inactive
pub fn resolve_permissions(user: Option<&User>) -> Vec<Permission> {
    match user {
        Some(user) if user.activo => permissions_for(user.role()).to_vec(),
        _ => Vec::new(),
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
