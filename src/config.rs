//! Configuration module for wsman
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/wsman/wsman.toml)
//! - User configuration (~/.wsman.toml, ~/.config/wsman/wsman.toml)
//! - Project configuration (./wsman.toml)
//! - Environment variables
//! - Command-line arguments (applied by the CLI on top of the result)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::AuthMode;
use crate::client::ClientBuilder;
use crate::enumeration::DEFAULT_MAX_PAGES;
use crate::transport::DEFAULT_TIMEOUT;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint settings
    pub endpoint: EndpointConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Endpoint and transport settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint URL, e.g. `https://10.0.0.12/wsman`
    pub url: Option<String>,

    /// Username
    pub username: Option<String>,

    /// Password
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Authentication scheme
    pub auth: AuthMode,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Verify the server certificate
    pub verify_tls: bool,

    /// Additional PEM root certificate
    pub ca_cert: Option<PathBuf>,

    /// Ask for items in the Enumerate response itself
    pub optimize_enumeration: bool,

    /// Page cap per enumeration, 0 for none
    pub max_pages: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            auth: AuthMode::default(),
            timeout: DEFAULT_TIMEOUT.as_secs(),
            verify_tls: false,
            ca_cert: None,
            optimize_enumeration: true,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .field("ca_cert", &self.ca_cert)
            .field("optimize_enumeration", &self.optimize_enumeration)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `-v` nor `RUST_LOG` is given
    pub level: String,

    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let explicit = config_path
            .cloned()
            .or_else(|| std::env::var("WSMAN_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Self::from_file(&path)?
            }
            None => Self::from_files(Self::search_paths().into_iter().filter(|p| p.exists()))?,
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Configuration files checked when no explicit path is given, lowest
    /// precedence first
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/wsman/wsman.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".wsman.toml"));
            paths.push(home.join(".config/wsman/wsman.toml"));
        }

        paths.push(PathBuf::from("wsman.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let layer: ConfigLayer = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(layer))
    }

    /// Apply a file layer; every field the file sets wins, everything else
    /// is kept
    fn merge(&self, layer: ConfigLayer) -> Config {
        let mut merged = self.clone();
        let endpoint = &mut merged.endpoint;
        let theirs = layer.endpoint;

        if theirs.url.is_some() {
            endpoint.url = theirs.url;
        }
        if theirs.username.is_some() {
            endpoint.username = theirs.username;
        }
        if theirs.password.is_some() {
            endpoint.password = theirs.password;
        }
        if let Some(auth) = theirs.auth {
            endpoint.auth = auth;
        }
        if let Some(timeout) = theirs.timeout {
            endpoint.timeout = timeout;
        }
        if let Some(verify_tls) = theirs.verify_tls {
            endpoint.verify_tls = verify_tls;
        }
        if theirs.ca_cert.is_some() {
            endpoint.ca_cert = theirs.ca_cert;
        }
        if let Some(optimize) = theirs.optimize_enumeration {
            endpoint.optimize_enumeration = optimize;
        }
        if let Some(max_pages) = theirs.max_pages {
            endpoint.max_pages = max_pages;
        }

        if let Some(level) = layer.logging.level {
            merged.logging.level = level;
        }
        if let Some(format) = layer.logging.format {
            merged.logging.format = format;
        }

        merged
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // WSMAN_ENDPOINT
        if let Ok(url) = std::env::var("WSMAN_ENDPOINT") {
            self.endpoint.url = Some(url);
        }

        // WSMAN_USERNAME
        if let Ok(username) = std::env::var("WSMAN_USERNAME") {
            self.endpoint.username = Some(username);
        }

        // WSMAN_PASSWORD
        if let Ok(password) = std::env::var("WSMAN_PASSWORD") {
            self.endpoint.password = Some(password);
        }

        // WSMAN_AUTH
        if let Ok(auth) = std::env::var("WSMAN_AUTH") {
            if let Ok(auth) = auth.parse() {
                self.endpoint.auth = auth;
            }
        }

        // WSMAN_TIMEOUT
        if let Ok(timeout) = std::env::var("WSMAN_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.endpoint.timeout = n;
            }
        }

        // WSMAN_VERIFY_TLS
        if let Ok(verify) = std::env::var("WSMAN_VERIFY_TLS") {
            self.endpoint.verify_tls = matches!(
                verify.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Client settings from this configuration, or `None` when no endpoint
    /// URL is configured
    pub fn client_builder(&self) -> Option<ClientBuilder> {
        let endpoint = &self.endpoint;
        let url = endpoint.url.as_deref()?;

        let mut builder = ClientBuilder::new(url)
            .auth(endpoint.auth)
            .timeout(Duration::from_secs(endpoint.timeout))
            .verify_tls(endpoint.verify_tls)
            .optimize_enumeration(endpoint.optimize_enumeration)
            .max_pages((endpoint.max_pages > 0).then_some(endpoint.max_pages));

        if let (Some(username), Some(password)) = (&endpoint.username, &endpoint.password) {
            builder = builder.credentials(username.as_str(), password.as_str());
        }
        if let Some(ca_cert) = &endpoint.ca_cert {
            builder = builder.ca_cert(ca_cert.clone());
        }

        Some(builder)
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }

    /// Load several files in order; later files override earlier ones
    pub fn from_files<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        paths
            .into_iter()
            .try_fold(Config::default(), |config, path| config.merge_from_file(path.as_ref()))
    }
}

// ============================================================================
// File Layers
// ============================================================================

/// One configuration file as written: only the keys it sets are `Some`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    endpoint: EndpointLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EndpointLayer {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    auth: Option<AuthMode>,
    timeout: Option<u64>,
    verify_tls: Option<bool>,
    ca_cert: Option<PathBuf>,
    optimize_enumeration: Option<bool>,
    max_pages: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
    format: Option<String>,
}
