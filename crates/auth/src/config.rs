//! Process-wide authentication settings, loaded once at startup.

use chrono::Duration;
use thiserror::Error;

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty signing secret")]
    MissingSecret(&'static str),

    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTtl { var: &'static str, value: String },
}

/// Signing secret plus token lifetimes.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthConfig {
    pub const SECRET_VAR: &'static str = "ACCESS_KEY";
    pub const ACCESS_TTL_VAR: &'static str = "ACCESS_TOKEN_TTL_SECS";
    pub const REFRESH_TTL_VAR: &'static str = "REFRESH_TOKEN_TTL_SECS";

    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Load from `ACCESS_KEY`, `ACCESS_TOKEN_TTL_SECS` and `REFRESH_TOKEN_TTL_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`AuthConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(Self::SECRET_VAR)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret(Self::SECRET_VAR))?;

        let access_ttl = ttl_from(&lookup, Self::ACCESS_TTL_VAR, DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl = ttl_from(&lookup, Self::REFRESH_TTL_VAR, DEFAULT_REFRESH_TTL_SECS)?;

        Ok(Self::new(secret)
            .with_access_ttl(access_ttl)
            .with_refresh_ttl(refresh_ttl))
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

fn ttl_from<F>(lookup: &F, var: &'static str, default_secs: i64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(Duration::seconds(default_secs));
    };

    match value.trim().parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(ConfigError::InvalidTtl { var, value }),
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}
