//! HTTP collaborator: sends shaped documents to the backend API.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::document::Document;
use crate::error::TransportError;

/// Default timeout for HTTP requests (10 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Operations the lifecycle layer needs from a backend client.
///
/// Paths are relative to the API root (e.g. `/detection_engine/rules`).
pub trait Transport {
    fn post(&self, path: &str, body: &Document) -> Result<Document, TransportError>;
    fn put(&self, path: &str, body: &Document) -> Result<Document, TransportError>;
    fn get(&self, path: &str) -> Result<Document, TransportError>;
    fn delete(&self, path: &str) -> Result<Document, TransportError>;
}

/// Connection settings for the backend API.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the Kibana instance, without the `/api` suffix.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// API key; takes precedence over basic auth when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Create a config with no credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        let content = std::fs::read_to_string(path).map_err(|e| TransportError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| TransportError::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Read a config from `SIEM_URL`, `SIEM_USERNAME`, `SIEM_PASSWORD`,
    /// `SIEM_API_KEY` and `SIEM_TIMEOUT`.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TransportError> {
        let url = lookup("SIEM_URL").ok_or_else(|| TransportError::Config {
            message: "SIEM_URL is not set".to_string(),
        })?;

        let timeout_secs = match lookup("SIEM_TIMEOUT") {
            Some(raw) => raw.parse().map_err(|_| TransportError::Config {
                message: format!("SIEM_TIMEOUT must be a number of seconds, got {raw:?}"),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            url,
            username: lookup("SIEM_USERNAME"),
            password: lookup("SIEM_PASSWORD"),
            api_key: lookup("SIEM_API_KEY"),
            timeout_secs,
        })
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/{}",
            self.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Decode a response body, treating an empty body as `null`.
pub(crate) fn decode_body(path: &str, body: &str) -> Result<Value, TransportError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    crate::document::decode_document_str(body).map_err(|source| TransportError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(feature = "remote")]
pub use http::HttpTransport;

#[cfg(feature = "remote")]
mod http {
    use reqwest::blocking::{Client, RequestBuilder};
    use reqwest::Method;
    use tracing::{debug, info};

    use super::{decode_body, ClientConfig, Transport};
    use crate::document::Document;
    use crate::error::TransportError;

    /// Blocking HTTP transport for the Kibana detection engine API.
    pub struct HttpTransport {
        client: Client,
        config: ClientConfig,
    }

    impl HttpTransport {
        /// Build a transport from connection settings.
        ///
        /// # Errors
        ///
        /// Returns `TransportError::Request` if the HTTP client can't be built.
        pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(|source| TransportError::Request {
                    url: config.url.clone(),
                    source,
                })?;
            Ok(Self { client, config })
        }

        fn request(&self, method: Method, path: &str) -> RequestBuilder {
            let builder = self
                .client
                .request(method, self.config.endpoint(path))
                .header("kbn-xsrf", "true");

            match (&self.config.api_key, &self.config.username) {
                (Some(key), _) => builder.header("Authorization", format!("ApiKey {}", key)),
                (None, Some(user)) => builder.basic_auth(user, self.config.password.as_deref()),
                (None, None) => builder,
            }
        }

        fn send(
            &self,
            method: &'static str,
            path: &str,
            builder: RequestBuilder,
        ) -> Result<Document, TransportError> {
            let url = self.config.endpoint(path);
            info!(method, %url, "sending request");

            let response = builder.send().map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

            let status = response.status();
            let body = response
                .text()
                .map_err(|source| TransportError::Request { url, source })?;
            debug!(method, path, status = status.as_u16(), "received response");

            // Check for HTTP errors before parsing
            if !status.is_success() {
                return Err(TransportError::Status {
                    method,
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            decode_body(path, &body)
        }
    }

    impl Transport for HttpTransport {
        fn post(&self, path: &str, body: &Document) -> Result<Document, TransportError> {
            self.send("POST", path, self.request(Method::POST, path).json(body))
        }

        fn put(&self, path: &str, body: &Document) -> Result<Document, TransportError> {
            self.send("PUT", path, self.request(Method::PUT, path).json(body))
        }

        fn get(&self, path: &str) -> Result<Document, TransportError> {
            self.send("GET", path, self.request(Method::GET, path))
        }

        fn delete(&self, path: &str) -> Result<Document, TransportError> {
            self.send("DELETE", path, self.request(Method::DELETE, path))
        }
    }
}
