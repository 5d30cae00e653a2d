//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{
    ImageStore, PasswordService, PostNotifier, PostRepository, TokenService, UserRepository,
};
use quill_core::services::{AuthService, FeedService};
use quill_infra::database::DatabaseConnections;
use quill_infra::{
    Argon2PasswordService, InMemoryStore, JwtConfig, JwtTokenService, LocalImageStore,
};

#[cfg(feature = "postgres")]
use quill_infra::database::{PostgresPostRepository, PostgresUserRepository};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub feed: Arc<FeedService>,
    pub tokens: Arc<dyn TokenService>,
    pub db: Option<Arc<DatabaseConnections>>,
    /// Upper bound for a single uploaded image.
    pub max_image_bytes: usize,
}

/// Storage backends the services are built on.
struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    db: Option<Arc<DatabaseConnections>>,
}

impl Repositories {
    fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            users: Arc::new(store.users()),
            posts: Arc::new(store.posts()),
            db: None,
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    ///
    /// A configured but unreachable database is a startup error.
    pub async fn new(config: &AppConfig, notifier: Arc<dyn PostNotifier>) -> anyhow::Result<Self> {
        let images = LocalImageStore::new(&config.image_dir);
        images.ensure_dir().await?;

        let repos = Self::repositories(config).await?;

        tracing::info!(
            image_dir = %config.image_dir.display(),
            database = repos.db.is_some(),
            "Application state initialized"
        );

        Ok(Self::assemble(
            repos,
            Arc::new(images),
            config.jwt.clone(),
            notifier,
            config.max_image_bytes,
        ))
    }

    /// State backed by the in-memory store.
    #[cfg(test)]
    pub fn in_memory(
        images: LocalImageStore,
        jwt: JwtConfig,
        notifier: Arc<dyn PostNotifier>,
        max_image_bytes: usize,
    ) -> Self {
        Self::assemble(
            Repositories::in_memory(),
            Arc::new(images),
            jwt,
            notifier,
            max_image_bytes,
        )
    }

    fn assemble(
        repos: Repositories,
        images: Arc<dyn ImageStore>,
        jwt: JwtConfig,
        notifier: Arc<dyn PostNotifier>,
        max_image_bytes: usize,
    ) -> Self {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(jwt));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        let auth = AuthService::new(repos.users.clone(), passwords, tokens.clone());
        let feed = FeedService::new(repos.posts, repos.users, images, notifier);

        Self {
            auth: Arc::new(auth),
            feed: Arc::new(feed),
            tokens,
            db: repos.db,
            max_image_bytes,
        }
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
        use migration::{Migrator, MigratorTrait};

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Ok(Repositories::in_memory());
        };

        let connections = DatabaseConnections::init(db_config).await?;

        if config.run_migrations {
            Migrator::up(&connections.main, None).await?;
            tracing::info!("Database migrations applied");
        }

        let conn = Arc::new(connections);
        Ok(Repositories {
            users: Arc::new(PostgresUserRepository::new(conn.main.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.main.clone())),
            db: Some(conn),
        })
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
        if config.database.is_some() {
            tracing::warn!("Built without postgres feature - ignoring DATABASE_URL");
        }
        tracing::info!("Using in-memory repositories");
        Ok(Repositories::in_memory())
    }
}
