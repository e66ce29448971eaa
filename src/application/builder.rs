use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::api::router::AppState;
use crate::application::{
    capture::{EntityChangeScopes, ManualAuditHelper, SecurityEventCapture},
    ports::AuditRecordRepository,
    retention::RetentionScheduler,
    use_cases::{AuditQueryService, CsrfTokenLedger},
};
use crate::config::Config;
use crate::domain::tracking::KindRegistry;
use crate::infrastructure::{
    persistence::{InMemoryAuditRecordRepository, PostgresAuditRecordRepository},
    session::SessionRegistry,
};

type BuildResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application builder for clean dependency injection and setup
pub struct ApplicationBuilder {
    config: Config,
    pool: Option<sqlx::PgPool>,
    audit_repo: Option<Arc<dyn AuditRecordRepository>>,
    kinds: Arc<KindRegistry>,
}

impl ApplicationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pool: None,
            audit_repo: None,
            kinds: Arc::new(KindRegistry::default()),
        }
    }

    /// Initialize database connection pool with retry logic
    pub async fn with_database(mut self) -> BuildResult<Self> {
        info!("Connecting to database");

        // Retry connection with exponential backoff
        let mut retries = 3;
        let mut delay = Duration::from_secs(1);
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(self.config.db_max_connections)
                .min_connections(self.config.db_min_connections)
                .acquire_timeout(Duration::from_secs(self.config.db_acquire_timeout_secs))
                .idle_timeout(Some(Duration::from_secs(self.config.db_idle_timeout_secs)))
                .max_lifetime(Some(Duration::from_secs(self.config.db_max_lifetime_secs)))
                .connect(&self.config.database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) if retries > 0 => {
                    retries -= 1;
                    tracing::warn!(
                        "Database connection failed, retrying in {:?} ({} retries left): {}",
                        delay,
                        retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!("Failed to connect to database after retries: {}", e);
                    return Err(Box::new(e));
                }
            }
        };

        info!(
            "Database pool configured: max={}, min={}, acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s",
            self.config.db_max_connections,
            self.config.db_min_connections,
            self.config.db_acquire_timeout_secs,
            self.config.db_idle_timeout_secs,
            self.config.db_max_lifetime_secs
        );

        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;

        self.pool = Some(pool);
        Ok(self)
    }

    /// Use an existing pool (migrations are the caller's concern)
    pub fn with_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Back the activity log with Postgres
    pub fn with_infrastructure(mut self) -> BuildResult<Self> {
        let pool = self.pool.as_ref().ok_or("Database pool not initialized")?;
        let audit_repo: Arc<dyn AuditRecordRepository> =
            Arc::new(PostgresAuditRecordRepository::new(pool.clone()));
        self.audit_repo = Some(audit_repo);

        info!("Infrastructure layer initialized");
        Ok(self)
    }

    /// Keep the activity log in process memory
    pub fn with_in_memory_log(mut self) -> Self {
        let audit_repo: Arc<dyn AuditRecordRepository> =
            Arc::new(InMemoryAuditRecordRepository::new());
        self.audit_repo = Some(audit_repo);
        info!("Using in-memory activity log");
        self
    }

    /// Use a caller-supplied repository
    pub fn with_repository(mut self, audit_repo: Arc<dyn AuditRecordRepository>) -> Self {
        self.audit_repo = Some(audit_repo);
        self
    }

    /// Replace the tracked entity kinds
    pub fn with_kinds(mut self, kinds: KindRegistry) -> Self {
        self.kinds = Arc::new(kinds);
        self
    }

    /// Build application state with all services
    pub fn build(self) -> BuildResult<AppState> {
        let audit_repo = self.audit_repo.ok_or("Audit repository not initialized")?;

        let queries = Arc::new(AuditQueryService::new(Arc::clone(&audit_repo)));
        let entity_changes = Arc::new(EntityChangeScopes::new(
            Arc::clone(&audit_repo),
            Arc::clone(&self.kinds),
        ));
        let security_events = Arc::new(SecurityEventCapture::new(
            Arc::clone(&audit_repo),
            self.config.logout_detection(),
        ));
        let manual_audit = Arc::new(ManualAuditHelper::new(Arc::clone(&audit_repo)));
        let csrf_ledger = Arc::new(CsrfTokenLedger::new(self.config.csrf_token_lifetime_secs));

        info!("Application layer initialized");

        Ok(AppState {
            pool: self.pool.map(Arc::new),
            queries,
            entity_changes,
            security_events,
            manual_audit,
            csrf_ledger,
            sessions: Arc::new(SessionRegistry::new()),
            kinds: self.kinds,
            config: Arc::new(self.config),
        })
    }

    /// Retention scheduler over the configured repository
    pub fn build_retention(&self) -> BuildResult<Arc<RetentionScheduler>> {
        let audit_repo = self
            .audit_repo
            .as_ref()
            .ok_or("Audit repository not initialized")?;

        Ok(Arc::new(RetentionScheduler::new(
            Arc::new(AuditQueryService::new(Arc::clone(audit_repo))),
            self.config.retention(),
        )))
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
