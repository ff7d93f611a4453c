use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod middleware;
mod models;
mod oauth;
mod repositories;
mod routes;
mod session;
#[cfg(test)]
mod testing;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    config::ServerConfig,
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    session::{SessionConfig, SessionService},
    telemetry::init_tracing,
};
use tokio::net::TcpListener;

use crate::{
    oauth::{OAuthClient, OAuthConfig},
    repositories::{UserAccounts, UserRepository},
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserAccounts>,
    pub sessions: SessionManager,
    pub oauth: OAuthClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let session_config = SessionConfig::from_env()?;
    let tokens = SessionService::new(&session_config, Arc::new(redis_pool.clone()));
    let sessions = SessionManager::new(Arc::new(redis_pool), tokens);

    let oauth_config = OAuthConfig::google_from_env()?;
    info!("Google sign-in configured: {:?}", oauth_config);
    let oauth = OAuthClient::new_google(oauth_config)?;

    let app_state = AppState {
        users: Arc::new(UserRepository::new(pool)),
        sessions,
        oauth,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let server_config = ServerConfig::load("AUTH", 3000)?;
    let address = server_config.bind_address()?;
    let listener = TcpListener::bind(address).await?;
    info!("Authentication service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
