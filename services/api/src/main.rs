use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod assistant;
mod conversation;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
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
    assistant::{AssistantConfig, GeminiClient},
    conversation::ConversationService,
    repositories::{ChatRepository, UserRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting API service");

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

    // Revocations are written by the auth service and read here
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    let session_config = SessionConfig::from_env()?;
    let sessions = SessionService::new(&session_config, Arc::new(redis_pool));

    let assistant_config = AssistantConfig::from_env()?;
    info!(
        "Assistant model {} with {:?} timeout",
        assistant_config.model, assistant_config.timeout
    );
    let reply_timeout = assistant_config.timeout;
    let assistant = GeminiClient::new(assistant_config)?;

    let conversations = ConversationService::new(
        Arc::new(ChatRepository::new(pool.clone())),
        Arc::new(assistant),
        reply_timeout,
    );

    let app_state = AppState {
        sessions,
        users: Arc::new(UserRepository::new(pool)),
        conversations,
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let server_config = ServerConfig::load("API", 3001)?;
    let address = server_config.bind_address()?;
    let listener = TcpListener::bind(address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
