//! HTTP data source backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use url::Url;

use super::DataSource;
use crate::error::{ConfigError, GridError, TransportError};

/// HTTP method used for page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Request as a JSON body.
    #[default]
    Post,
    /// Request as query parameters; nested objects use `key[sub]` names.
    Get,
}

/// Page requests over HTTP.
///
/// Cheap to clone; the underlying client pools connections.
///
/// # Example
///
/// ```ignore
/// use iotable_lib::remote::{HttpDataSource, Method};
///
/// let source = HttpDataSource::builder("https://example.com/rows")
///     .method(Method::Get)
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    url: Url,
    method: Method,
    http_client: Client,
    timeout: Option<Duration>,
}

impl HttpDataSource {
    /// Creates a builder for the given endpoint.
    pub fn builder(url: impl Into<String>) -> HttpDataSourceBuilder {
        HttpDataSourceBuilder {
            url: url.into(),
            method: Method::Post,
            timeout: None,
            connect_timeout: None,
            http_client: None,
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn method(&self) -> Method {
        self.method
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, request: Json) -> Result<Json, TransportError> {
        log::debug!("{:?} {}", self.method, self.url);

        let mut builder = match self.method {
            Method::Post => self.http_client.post(self.url.clone()).json(&request),
            Method::Get => {
                let mut url = self.url.clone();
                url.query_pairs_mut().extend_pairs(query_pairs(&request));
                self.http_client.get(url)
            }
        };
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("Row request failed with HTTP {}", status.as_u16());
            return Err(TransportError::http(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| TransportError::parse_with_body(e.to_string(), body))
    }
}

/// Flattens a request object into form-style query pairs.
///
/// `{"sort": {"name": "asc"}, "current": 1}` becomes
/// `sort[name]=asc&current=1`.
pub fn query_pairs(request: &Json) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Json::Object(map) = request {
        for (key, value) in map {
            push_pairs(key.clone(), value, &mut pairs);
        }
    }
    pairs
}

fn push_pairs(key: String, value: &Json, pairs: &mut Vec<(String, String)>) {
    match value {
        Json::Object(map) => {
            for (sub, inner) in map {
                push_pairs(format!("{key}[{sub}]"), inner, pairs);
            }
        }
        Json::Array(items) => {
            for item in items {
                push_pairs(format!("{key}[]"), item, pairs);
            }
        }
        Json::String(s) => pairs.push((key, s.clone())),
        Json::Null => pairs.push((key, String::new())),
        other => pairs.push((key, other.to_string())),
    }
}

/// Builder for [`HttpDataSource`].
pub struct HttpDataSourceBuilder {
    url: String,
    method: Method,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http_client: Option<Client>,
}

impl HttpDataSourceBuilder {
    /// Defaults to `POST`.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Applied when the builder creates its own client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Uses a custom HTTP client.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the source, rejecting an empty or unparseable url.
    pub fn build(self) -> Result<HttpDataSource, GridError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl.into());
        }
        let url = Url::parse(&self.url)
            .map_err(|e| ConfigError::invalid_url(&self.url, e.to_string()))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build().map_err(TransportError::from)?
            }
        };

        Ok(HttpDataSource {
            url,
            method: self.method,
            http_client,
            timeout: self.timeout,
        })
    }
}
