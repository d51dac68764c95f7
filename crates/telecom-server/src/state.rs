use crate::auth::TokenService;
use crate::config::ServerConfig;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Create a new app state
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        let tokens = TokenService::new(&config.auth);
        Self {
            pool,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        }
    }
}
