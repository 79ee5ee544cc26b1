//! Client configuration validation
//!
//! Generated clients collect their runtime dependencies in a
//! [`ClientConfig`]; `validate` runs before the first request is built.
//! The transport and identity seams stay abstract: the codec only cares
//! that they were supplied.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::http::{Request, Response};

/// Maximum accepted `app_id` length.
pub const MAX_APP_ID_LEN: usize = 50;

/// Configuration errors surfaced before any request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("client config is missing a region")]
    MissingRegion,

    #[error("client config is missing an HTTP client")]
    MissingHttpClient,

    #[error("client config is missing an identity manager")]
    MissingIdentityManager,

    #[error("app id exceeds {MAX_APP_ID_LEN} characters")]
    AppIdTooLong,

    #[error("app id may only contain alphanumerics, `-`, and `_`")]
    AppIdInvalid,
}

/// The transport seam the generated client sends through.
pub trait HttpTransport {
    fn send(&self, request: &Request) -> std::io::Result<Response>;
}

/// The identity seam used to sign or authorize requests.
pub trait IdentityProvider {
    fn resolve_identity(&self) -> std::io::Result<String>;
}

/// Runtime configuration for a generated client.
#[derive(Default, Clone)]
pub struct ClientConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub app_id: Option<String>,
    pub http_client: Option<Arc<dyn HttpTransport>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("app_id", &self.app_id)
            .field("http_client", &self.http_client.is_some())
            .field("identity", &self.identity.is_some())
            .finish()
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpTransport>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Check required fields and the app-id charset/length rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.is_none() {
            return Err(ConfigError::MissingRegion);
        }
        if self.http_client.is_none() {
            return Err(ConfigError::MissingHttpClient);
        }
        if self.identity.is_none() {
            return Err(ConfigError::MissingIdentityManager);
        }
        if let Some(app_id) = &self.app_id {
            validate_app_id(app_id)?;
        }
        Ok(())
    }
}

/// App ids feed the user-agent; keep them short and unambiguous.
pub fn validate_app_id(app_id: &str) -> Result<(), ConfigError> {
    if app_id.len() > MAX_APP_ID_LEN {
        return Err(ConfigError::AppIdTooLong);
    }
    let valid = app_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !valid {
        return Err(ConfigError::AppIdInvalid);
    }
    Ok(())
}
