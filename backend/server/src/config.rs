use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use forms::only_digits;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Secret {0} not found in /run/secrets or the environment")]
    MissingSecret(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub secret_key: String,
    pub templates_dir: String,
    pub static_dir: String,
    pub session_ttl: Duration,
    pub admin_cpfs: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: var("REDIS_URL").ok(),
            secret_key: read_secret("SECRET_KEY")?,
            templates_dir: try_load("TEMPLATES_DIR", "templates")?,
            static_dir: try_load("STATIC_DIR", "static")?,
            session_ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", "604800")?),
            admin_cpfs: parse_cpf_list(&var("ADMIN_CPFS").unwrap_or_default()),
        })
    }

    /// In-memory setup with a fixed secret, used by tests and local runs.
    pub fn ephemeral(secret_key: &str) -> Self {
        Self {
            port: 0,
            redis_url: None,
            secret_key: secret_key.to_string(),
            templates_dir: "templates".to_string(),
            static_dir: "static".to_string(),
            session_ttl: Duration::from_secs(60 * 60),
            admin_cpfs: Vec::new(),
        }
    }

    pub fn is_admin_cpf(&self, cpf: &str) -> bool {
        self.admin_cpfs.iter().any(|admin| admin == cpf)
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn read_secret(secret_name: &str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .or_else(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
            env::var(secret_name)
        })
        .ok()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(secret_name.to_string()))
}

fn parse_cpf_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(only_digits)
        .filter(|cpf| !cpf.is_empty())
        .collect()
}
