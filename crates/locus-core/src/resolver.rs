//! Location resolvers
//!
//! A resolver answers one question: given the client's IP, where is it? The
//! request and response shapes are the location service's wire contract:
//! request `{client_ip}`, response `{region, zone, campus}`.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{LocationConfig, ProviderKind},
    location::Location,
    Error, Result,
};

/// Request sent to the location service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub client_ip: String,
}

/// Answer of the location service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationResponse {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub campus: String,
}

impl From<LocationResponse> for Location {
    fn from(resp: LocationResponse) -> Self {
        Self::new(resp.region, resp.zone, resp.campus)
    }
}

/// Looks up the location of a client
#[async_trait]
pub trait LocationResolver: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Resolve the location of `client_ip`.
    ///
    /// An empty [`Location`] means the service has no record of the client;
    /// failures to ask are errors.
    async fn fetch(&self, client_ip: &str) -> Result<Location>;
}

/// Resolver returning a fixed location
#[derive(Debug, Clone)]
pub struct StaticResolver {
    location: Location,
}

impl StaticResolver {
    pub const fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationResolver for StaticResolver {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _client_ip: &str) -> Result<Location> {
        Ok(self.location.clone())
    }
}

/// Resolver talking JSON over HTTP to a location service.
///
/// Sends `POST {endpoint}` with a [`LocationRequest`] body and expects a
/// [`LocationResponse`].
#[derive(Debug, Clone)]
pub struct HttpResolver {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpResolver {
    /// Create a resolver for `endpoint` with a per-request `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Timeouts keep their own error kind; everything else is a transport failure
    fn request_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl LocationResolver for HttpResolver {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, client_ip: &str) -> Result<Location> {
        debug!(endpoint = %self.endpoint, client_ip, "requesting location");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&LocationRequest {
                client_ip: client_ip.to_string(),
            })
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Resolver {
                resolver: self.name().to_string(),
                reason: format!("{} answered {status}", self.endpoint),
            });
        }

        let body: LocationResponse = response.json().await.map_err(|e| self.request_error(e))?;
        Ok(body.into())
    }
}

/// Build the resolver selected by `config`
pub fn resolver_from_config(config: &LocationConfig) -> Result<Arc<dyn LocationResolver>> {
    match config.provider {
        ProviderKind::Static => Ok(Arc::new(StaticResolver::new(config.static_location()))),
        ProviderKind::Http => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                Error::InvalidConfig("location.endpoint is required for the http provider".into())
            })?;
            Ok(Arc::new(HttpResolver::new(endpoint, config.timeout())?))
        }
    }
}
