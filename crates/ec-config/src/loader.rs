//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError, SmtpTls};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "eclinic.toml",
    "./config/config.toml",
    "/etc/eclinic/config.toml",
];

/// Loads defaults, then the first config file found, then environment overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!(?path, "Loading configuration from file");
                AppConfig::from_file(&path)?
            }
            None => AppConfig::default(),
        };

        apply_env_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured config file does not exist");
        }

        if let Ok(path) = env::var("ECLINIC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Apply environment overrides using `lookup` to read variables.
pub(crate) fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = lookup("ECLINIC_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = lookup("ECLINIC_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("ECLINIC_CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // MongoDB
    if let Some(val) = lookup("MONGODB_URI") {
        config.mongodb.uri = val;
    }
    if let Some(val) = lookup("MONGODB_DATABASE") {
        config.mongodb.database = val;
    }

    // Auth
    if let Some(val) = lookup("JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(days) = lookup("ECLINIC_SESSION_TTL_DAYS").and_then(|v| v.parse().ok()) {
        config.auth.session_ttl_days = days;
    }

    if let Some(val) = lookup("ECLINIC_PRODUCTION") {
        config.production = parse_bool(&val);
    }
    if let Some(val) = lookup("APP_URL") {
        config.app_url = val;
    }

    // Email
    if let Some(val) = lookup("SMTP_HOST") {
        config.email.smtp_host = val;
    }
    if let Some(port) = lookup("SMTP_PORT").and_then(|v| v.parse().ok()) {
        config.email.smtp_port = port;
    }
    if let Some(val) = lookup("SMTP_USERNAME") {
        config.email.smtp_username = val;
    }
    if let Some(val) = lookup("SMTP_PASSWORD") {
        config.email.smtp_password = val;
    }
    if let Some(val) = lookup("SMTP_TLS") {
        config.email.tls = match val.to_ascii_lowercase().as_str() {
            "tls" => SmtpTls::Tls,
            "none" => SmtpTls::None,
            _ => SmtpTls::Starttls,
        };
    }
    if let Some(val) = lookup("SMTP_FROM") {
        config.email.from = val;
    }

    // Blob storage
    if let Some(val) = lookup("BLOB_ENDPOINT") {
        config.blob.endpoint = val;
    }
    if let Some(val) = lookup("BLOB_TOKEN") {
        config.blob.token = val;
    }

    // Seeding
    if let Some(val) = lookup("SEED_ADMIN_EMAIL") {
        config.seed.admin_email = val;
    }
    if let Some(val) = lookup("SEED_ADMIN_PASSWORD") {
        config.seed.admin_password = val;
    }
}
