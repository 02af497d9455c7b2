//! Runtime configuration, read once from `TAXDESK_*` environment variables.
//!
//! Every setting has a default suitable for a local run except the token secret, which
//! must be provided in release builds. Debug builds fall back to a random per-process
//! secret so tokens simply stop validating after a restart.

use chrono::{Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

const PREFIX: &str = "TAXDESK_";

/// Per-file ceiling for uploaded documents.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{0} must be set")]
    Missing(String),
}

/// Optional first-run administrator, created at start-up when no account holds the NSTIN.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub nstin: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub token_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub max_upload_bytes: usize,
    pub admin_email: Option<String>,
    pub outbox_dir: Option<PathBuf>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| k.strip_prefix(PREFIX).map(|k| (k.to_string(), v)))
            .collect();
        Self::from_vars(&vars, cfg!(debug_assertions))
    }

    /// Builds the configuration from already-stripped keys (`PORT`, not `TAXDESK_PORT`).
    pub fn from_vars(
        vars: &HashMap<String, String>,
        allow_ephemeral_secret: bool,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&get("PORT"), "PORT", 8080u16)?;
        let public_url = get("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        let token_secret = match get("TOKEN_SECRET") {
            Some(secret) if secret.len() >= 16 => secret.into_bytes(),
            Some(secret) => {
                return Err(ConfigError::Invalid {
                    key: format!("{PREFIX}TOKEN_SECRET"),
                    value: "*".repeat(secret.len()),
                    reason: "must be at least 16 characters".to_string(),
                })
            }
            None if allow_ephemeral_secret => {
                log::warn!("{PREFIX}TOKEN_SECRET not set, using a random per-process secret");
                let mut secret = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
            None => return Err(ConfigError::Missing(format!("{PREFIX}TOKEN_SECRET"))),
        };

        let token_ttl_days = parse_or(&get("TOKEN_TTL_DAYS"), "TOKEN_TTL_DAYS", 7i64)?;
        let invalid_ttl = |reason: &str| ConfigError::Invalid {
            key: format!("{PREFIX}TOKEN_TTL_DAYS"),
            value: token_ttl_days.to_string(),
            reason: reason.to_string(),
        };
        if token_ttl_days <= 0 {
            return Err(invalid_ttl("must be positive"));
        }
        // Expiry timestamps must stay representable for every token issued.
        let token_ttl = Duration::try_days(token_ttl_days)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| invalid_ttl("too large"))?;

        let bootstrap_admin = match (
            get("BOOTSTRAP_ADMIN_NSTIN"),
            get("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(nstin), Some(password)) => Some(BootstrapAdmin {
                email: get("BOOTSTRAP_ADMIN_EMAIL")
                    .unwrap_or_else(|| format!("{}@admin.local", nstin)),
                nstin,
                password,
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Missing(format!(
                    "both {PREFIX}BOOTSTRAP_ADMIN_NSTIN and {PREFIX}BOOTSTRAP_ADMIN_PASSWORD"
                )))
            }
        };

        Ok(Self {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("taxdesk.sqlite")),
            storage_dir: get("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse_or(
                &get("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            admin_email: get("ADMIN_EMAIL"),
            outbox_dir: get("OUTBOX_DIR").map(PathBuf::from),
            host,
            port,
            public_url,
            token_secret,
            token_ttl,
            bootstrap_admin,
        })
    }
}

fn parse_or<T>(raw: &Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: format!("{PREFIX}{key}"),
            value: value.clone(),
            reason: e.to_string(),
        }),
    }
}
