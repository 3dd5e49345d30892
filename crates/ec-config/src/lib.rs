//! E-Clinic Configuration
//!
//! TOML configuration with environment variable overrides. Every section
//! has defaults suitable for local development, so an empty file (or no
//! file at all) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Secret used when none is configured. Rejected in production.
pub const DEV_JWT_SECRET: &str = "dev_secret";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub blob: BlobConfig,
    pub seed: SeedConfig,

    /// Public URL of the web application, used for links in emails
    pub app_url: String,

    /// Production mode: secure cookies, strict secret validation
    pub production: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mongodb: MongoConfig::default(),
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
            blob: BlobConfig::default(),
            seed: SeedConfig::default(),
            app_url: "http://localhost:3000".to_string(),
            production: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "eclinic".to_string(),
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub cookie_name: String,
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            cookie_name: "auth_token".to_string(),
            session_ttl_days: 7,
        }
    }
}

/// SMTP transport security
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// STARTTLS upgrade (port 587)
    #[default]
    Starttls,
    /// Implicit TLS (port 465)
    Tls,
    /// Plain connection, for local mail catchers only
    None,
}

/// Outbound email configuration. Email is disabled when `smtp_host` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub tls: SmtpTls,
    pub from: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            tls: SmtpTls::default(),
            from: "E-Clinic <no-reply@eclinic.local>".to_string(),
            max_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

impl EmailConfig {
    pub fn is_enabled(&self) -> bool {
        !self.smtp_host.trim().is_empty()
    }
}

/// Blob storage for consultation attachments and hospital card images.
/// Uploads are disabled when `endpoint` is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub endpoint: String,
    pub token: String,
}

impl BlobConfig {
    pub fn is_enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

/// Admin account created at startup when `admin_email` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_email: String::new(),
            admin_password: String::new(),
            admin_name: "Administrator".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from the standard locations with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError("auth.jwt_secret must not be empty".into()));
        }
        if self.production && self.auth.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set in production".into(),
            ));
        }
        if self.auth.session_ttl_days <= 0 {
            return Err(ConfigError::ValidationError("auth.session_ttl_days must be positive".into()));
        }
        if self.email.is_enabled() && self.email.max_attempts == 0 {
            return Err(ConfigError::ValidationError("email.max_attempts must be at least 1".into()));
        }
        if !self.seed.admin_email.is_empty() && self.seed.admin_password.len() < 6 {
            return Err(ConfigError::ValidationError(
                "seed.admin_password must be at least 6 characters".into(),
            ));
        }
        Ok(())
    }

    pub fn example_toml() -> String {
        r#"# E-Clinic Configuration
# Environment variables override these settings

app_url = "http://localhost:3000"
production = false

[http]
port = 3000
host = "0.0.0.0"
cors_origins = ["http://localhost:3000"]

[mongodb]
uri = "mongodb://localhost:27017"
database = "eclinic"

[auth]
jwt_secret = "change-me"
cookie_name = "auth_token"
session_ttl_days = 7

[email]
smtp_host = ""          # empty disables email
smtp_port = 587
smtp_username = ""
smtp_password = ""
tls = "starttls"        # starttls, tls or none
from = "E-Clinic <no-reply@eclinic.local>"
max_attempts = 2
retry_delay_ms = 500

[blob]
endpoint = ""           # empty disables uploads
token = ""

[seed]
admin_email = ""
admin_password = ""
admin_name = "Administrator"
"#
        .to_string()
    }
}
