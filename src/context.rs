/// Application context and dependency wiring
///
/// Everything is constructed once at startup and handed to the router as
/// state. There is no process-wide registry.
use crate::{
    config::ServerConfig,
    db,
    error::{ClinicError, ClinicResult},
    identity::TokenService,
    resolution::{ResolutionController, ResolutionService, SqliteResolutionRepository},
    specialization::{SpecializationRepository, SqliteSpecializationRepository},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub token_service: Arc<TokenService>,
    pub resolutions: ResolutionController,
    pub specializations: Arc<dyn SpecializationRepository>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ClinicResult<Self> {
        // Validate configuration
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let options = db::DatabaseOptions {
            max_connections: config.storage.max_connections,
            ..Default::default()
        };
        let pool = db::create_pool(&config.storage.database, options).await?;

        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        tracing::info!("Database ready at {:?}", config.storage.database);

        Ok(Self::with_pool(config, pool))
    }

    /// Wire services over an already-migrated pool
    pub fn with_pool(config: ServerConfig, pool: SqlitePool) -> Self {
        let token_service = Arc::new(TokenService::new(
            &config.authentication.jwt_secret,
            config.authentication.token_ttl_seconds,
            config.authentication.token_leeway_seconds,
        ));

        let specializations: Arc<dyn SpecializationRepository> =
            Arc::new(SqliteSpecializationRepository::new(pool.clone()));
        let resolution_service = Arc::new(ResolutionService::new(
            Arc::new(SqliteResolutionRepository::new(pool.clone())),
            Arc::clone(&specializations),
            config.pagination,
        ));
        let resolutions = ResolutionController::new(resolution_service);

        Self {
            config: Arc::new(config),
            db: pool,
            token_service,
            resolutions,
            specializations,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ClinicResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ClinicError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }
        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
