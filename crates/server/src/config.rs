//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_API_KEY` - Pre-shared admin credential (min 32 chars)
//!
//! ## Store backend
//! - `STORE_BACKEND` - `memory` (default) or `firestore`
//! - `FIRESTORE_PROJECT_ID` - Project id (required for `firestore`)
//! - `FIRESTORE_ACCESS_TOKEN` - Bearer token (required for `firestore`)
//! - `FIRESTORE_ENDPOINT` - API endpoint (default: <https://firestore.googleapis.com>)
//!
//! ## Asset backend
//! - `ASSET_BACKEND` - `null` (default) or `cloudinary`
//! - `CLOUDINARY_CLOUD_NAME` / `CLOUDINARY_API_KEY` / `CLOUDINARY_API_SECRET`
//!   (required for `cloudinary`)
//!
//! ## Optional
//! - `TIENDA_HOST` - Bind address (default: 127.0.0.1)
//! - `TIENDA_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ADMIN_KEY_LENGTH: usize = 32;
const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Document store backend selection
    pub store: StoreBackend,
    /// Asset host backend selection
    pub assets: AssetBackend,
    /// Pre-shared admin credential for catalog writes
    pub admin_api_key: SecretString,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Which document store backend to use.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// In-memory store (tests, local development)
    Memory,
    /// Hosted Firestore over REST
    Firestore(FirestoreConfig),
}

/// Which asset host backend to use.
#[derive(Debug, Clone)]
pub enum AssetBackend {
    /// No-op asset host (tests, local development)
    Null,
    /// Cloudinary REST API
    Cloudinary(CloudinaryConfig),
}

/// Firestore REST API configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Google Cloud project id
    pub project_id: String,
    /// API endpoint, overridable for emulators
    pub endpoint: String,
    /// Bearer token for the REST API
    pub access_token: SecretString,
}

/// Cloudinary configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (account identifier)
    pub cloud_name: String,
    /// Public API key
    pub api_key: String,
    /// API secret used for request signatures
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = optional_env("TIENDA_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TIENDA_HOST".to_owned(), e.to_string()))?;

        let port = optional_env("TIENDA_PORT")
            .unwrap_or_else(|| "3000".to_owned())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TIENDA_PORT".to_owned(), e.to_string()))?;

        let admin_api_key = required_env("ADMIN_API_KEY")?;
        if admin_api_key.len() < MIN_ADMIN_KEY_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_API_KEY".to_owned(),
                format!("must be at least {MIN_ADMIN_KEY_LENGTH} characters"),
            ));
        }

        let store = match optional_env("STORE_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => StoreBackend::Memory,
            "firestore" => StoreBackend::Firestore(FirestoreConfig {
                project_id: required_env("FIRESTORE_PROJECT_ID")?,
                endpoint: optional_env("FIRESTORE_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_ENDPOINT.to_owned()),
                access_token: SecretString::from(required_env("FIRESTORE_ACCESS_TOKEN")?),
            }),
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STORE_BACKEND".to_owned(),
                    format!("unknown backend: {other}"),
                ));
            }
        };

        let assets = match optional_env("ASSET_BACKEND").as_deref().unwrap_or("null") {
            "null" => AssetBackend::Null,
            "cloudinary" => AssetBackend::Cloudinary(CloudinaryConfig {
                cloud_name: required_env("CLOUDINARY_CLOUD_NAME")?,
                api_key: required_env("CLOUDINARY_API_KEY")?,
                api_secret: SecretString::from(required_env("CLOUDINARY_API_SECRET")?),
            }),
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "ASSET_BACKEND".to_owned(),
                    format!("unknown backend: {other}"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            store,
            assets,
            admin_api_key: SecretString::from(admin_api_key),
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Socket address to bind the listener to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    optional_env(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_owned()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
