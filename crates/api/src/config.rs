//! Startup configuration for the HTTP server.

use std::net::SocketAddr;

use spendwise_auth::{AuthConfig, ConfigError};
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error(transparent)]
    Auth(#[from] ConfigError),

    #[error("BIND_ADDR must be a socket address, got '{0}'")]
    InvalidBindAddr(String),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ApiConfigError> {
        let auth = AuthConfig::from_env()?;

        let raw = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw
            .parse()
            .map_err(|_| ApiConfigError::InvalidBindAddr(raw.clone()))?;

        Ok(Self { bind_addr, auth })
    }
}
