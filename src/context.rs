/// Application context and dependency injection
use crate::{
    account::SessionManager,
    audit::AuditLogger,
    comunicaciones::ComunicacionRepository,
    config::ServerConfig,
    db,
    error::AppResult,
    socios::SocioRepository,
    users::UserRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub session_manager: Arc<SessionManager>,
    pub users: UserRepository,
    pub socios: SocioRepository,
    pub comunicaciones: ComunicacionRepository,
    pub audit: AuditLogger,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let config = Arc::new(config);

        let users = UserRepository::new(pool.clone());
        let socios = SocioRepository::new(pool.clone());
        let comunicaciones = ComunicacionRepository::new(pool.clone());
        let audit = AuditLogger::new(pool.clone(), config.audit.clone());
        let session_manager = Arc::new(SessionManager::new(
            pool.clone(),
            Arc::clone(&config),
            users.clone(),
            audit.clone(),
        ));

        Ok(Self {
            config,
            db: pool,
            session_manager,
            users,
            socios,
            comunicaciones,
            audit,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
