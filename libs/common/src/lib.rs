//! Common library for the AgriLens services
//!
//! This crate provides shared functionality used by the auth and api
//! services: database connectivity and migrations, the Redis client,
//! session tokens, listener configuration and tracing setup.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod session;
pub mod telemetry;
