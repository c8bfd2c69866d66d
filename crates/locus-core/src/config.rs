//! Configuration loading
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. TOML file (explicit path)
//! 3. Environment variables: `LOCUS_*`
//!
//! # Example Config
//!
//! ```toml
//! client_name = "checkout"
//! bind_ip = "10.0.0.7"
//!
//! [location]
//! provider = "http"
//! endpoint = "http://location.internal:8090/v1/location"
//! timeout_ms = 500
//! retry_interval_ms = 2000
//! max_attempts = 5
//! ```

use std::{fmt, net::IpAddr, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{location::Location, Error, Result};

/// Where the client's location comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Fixed location taken from configuration
    #[default]
    Static,
    /// Remote location service spoken to over HTTP
    Http,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "static" | "local" => Ok(Self::Static),
            "http" | "remote" => Ok(Self::Http),
            _ => Err(Error::InvalidConfig(format!(
                "Invalid location provider: {s}. Must be one of: static, http"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Location discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub provider: ProviderKind,
    /// Static region
    pub region: String,
    /// Static zone
    pub zone: String,
    /// Static campus
    pub campus: String,
    /// Location service URL (http provider)
    pub endpoint: Option<String>,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Pause between discovery attempts
    pub retry_interval_ms: u64,
    /// Attempts before the updater gives up
    pub max_attempts: u32,
    /// How long callers wait for readiness by default
    pub wait_ready_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Static,
            region: String::new(),
            zone: String::new(),
            campus: String::new(),
            endpoint: None,
            timeout_ms: 1000,
            retry_interval_ms: 1000,
            max_attempts: 3,
            wait_ready_ms: 5000,
        }
    }
}

impl LocationConfig {
    /// Location configured for the static provider
    pub fn static_location(&self) -> Location {
        Location::new(&self.region, &self.zone, &self.campus)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub const fn wait_ready(&self) -> Duration {
        Duration::from_millis(self.wait_ready_ms)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocusConfig {
    /// Client name reported in the session identity
    pub client_name: String,
    /// Client version reported in the session identity
    pub client_version: String,
    /// Address the client binds to; also sent to the location service
    pub bind_ip: Option<String>,
    pub location: LocationConfig,
}

impl Default for LocusConfig {
    fn default() -> Self {
        Self {
            client_name: "locus".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            bind_ip: None,
            location: LocationConfig::default(),
        }
    }
}

impl LocusConfig {
    /// Load configuration from all sources with hierarchy
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The config file cannot be read or is malformed TOML
    /// - An environment override has an invalid value
    /// - The resulting config fails validation
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        // 1. Start with built-in defaults
        let mut config = Self::default();

        // 2. Load the file if one was given
        if let Some(path) = path {
            config = load_toml_file(path).await?;
        }

        // 3. Apply environment variable overrides
        config.apply_env_vars()?;

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document; keys not present keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Apply environment variable overrides
    fn apply_env_vars(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `LOCUS_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LOCUS_CLIENT_NAME") {
            self.client_name = value;
        }
        if let Some(value) = lookup("LOCUS_BIND_IP") {
            self.bind_ip = Some(value);
        }
        if let Some(value) = lookup("LOCUS_LOCATION_PROVIDER") {
            self.location.provider = value.parse()?;
        }
        if let Some(value) = lookup("LOCUS_REGION") {
            self.location.region = value;
        }
        if let Some(value) = lookup("LOCUS_ZONE") {
            self.location.zone = value;
        }
        if let Some(value) = lookup("LOCUS_CAMPUS") {
            self.location.campus = value;
        }
        if let Some(value) = lookup("LOCUS_LOCATION_ENDPOINT") {
            self.location.endpoint = Some(value);
        }
        if let Some(value) = lookup("LOCUS_TIMEOUT_MS") {
            self.location.timeout_ms = parse_number("LOCUS_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("LOCUS_RETRY_INTERVAL_MS") {
            self.location.retry_interval_ms = parse_number("LOCUS_RETRY_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("LOCUS_MAX_ATTEMPTS") {
            self.location.max_attempts = parse_number("LOCUS_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("LOCUS_WAIT_READY_MS") {
            self.location.wait_ready_ms = parse_number("LOCUS_WAIT_READY_MS", &value)?;
        }
        Ok(())
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.client_name.trim().is_empty() {
            return Err(Error::InvalidConfig("client_name cannot be empty".into()));
        }
        self.parsed_bind_ip()?;

        let location = &self.location;
        if location.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "location.timeout_ms must be greater than 0".into(),
            ));
        }
        if location.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "location.max_attempts must be at least 1".into(),
            ));
        }
        if location.provider == ProviderKind::Http {
            match location.endpoint.as_deref() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(Error::InvalidConfig(format!(
                        "location.endpoint must be an http(s) URL, got: {url}"
                    )))
                }
                None => {
                    return Err(Error::InvalidConfig(
                        "location.endpoint is required for the http provider".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// `bind_ip` parsed as an address
    pub fn parsed_bind_ip(&self) -> Result<Option<IpAddr>> {
        self.bind_ip
            .as_deref()
            .map(|raw| {
                raw.parse::<IpAddr>()
                    .map_err(|e| Error::InvalidConfig(format!("Invalid bind_ip '{raw}': {e}")))
            })
            .transpose()
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("Invalid {key} value: {e}")))
}

/// Load a TOML file into a config
async fn load_toml_file(path: &Path) -> Result<LocusConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::IoError(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::ParseError(format!("Failed to parse config: {}: {e}", path.display())))
}
