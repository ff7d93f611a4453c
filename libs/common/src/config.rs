//! Listener configuration shared by the services
//!
//! Values come from built-in defaults, overridden by `<PREFIX>_HOST` and
//! `<PREFIX>_PORT` environment variables.

use std::net::SocketAddr;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Where a service binds its HTTP listener
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load the listener configuration for the service using `prefix`
    pub fn load(prefix: &str, default_port: u16) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", i64::from(default_port))?
            .add_source(Environment::with_prefix(prefix).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Socket address to bind
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("Invalid bind address: {}", e)))
    }
}
