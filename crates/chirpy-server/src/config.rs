use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub polka_api_key: Option<String>,
    pub db_path: PathBuf,
    pub assets_dir: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => bail!("JWT_SECRET must be set"),
        };

        let polka_api_key = lookup("POLKA_API_KEY").filter(|k| !k.is_empty());
        if polka_api_key.is_none() {
            warn!("POLKA_API_KEY is not set; webhooks will be rejected");
        }

        let db_path = lookup("CHIRPY_DB_PATH").unwrap_or_else(|| "database.json".into());
        let assets_dir = lookup("CHIRPY_ASSETS_DIR").unwrap_or_else(|| "public".into());
        let host = lookup("CHIRPY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("CHIRPY_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("CHIRPY_PORT must be a port number")?;

        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            polka_api_key,
            db_path: db_path.into(),
            assets_dir: assets_dir.into(),
            addr,
        })
    }
}
