use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Process configuration, read once at startup.
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    pub db_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("BELAY_JWT_SECRET").unwrap_or_else(|| {
            warn!("BELAY_JWT_SECRET not set, using the development secret");
            DEV_SECRET.into()
        });
        let db_path = lookup("BELAY_DB_PATH").unwrap_or_else(|| "belay.db".into());
        let host = lookup("BELAY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("BELAY_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("BELAY_PORT must be a port number")?;
        let ttl_hours: i64 = lookup("BELAY_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "12".into())
            .parse()
            .context("BELAY_TOKEN_TTL_HOURS must be a whole number of hours")?;
        let timeout_ms: u64 = lookup("BELAY_DB_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("BELAY_DB_TIMEOUT_MS must be a number of milliseconds")?;

        if ttl_hours <= 0 {
            anyhow::bail!("BELAY_TOKEN_TTL_HOURS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            addr: format!("{}:{}", host, port).parse()?,
            token_ttl: chrono::Duration::hours(ttl_hours),
            db_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
