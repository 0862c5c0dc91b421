//! HTTP/JSON backend client.
//!
//! # Responsibilities
//! - Turn a [`ResourceRequest`] into a GET against the configured base URL
//! - Attach credentials when configured
//! - Map transport failures, non-2xx statuses and bad JSON to [`RemoteError`]

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::BackendConfig;
use crate::remote::error::RemoteError;
use crate::remote::resource::{RemoteResource, ResourceRequest};

/// REST backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpResource {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpResource {
    /// Create a client for the configured backend.
    pub fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            RemoteError::InvalidRequest(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidRequest(format!(
                "Base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for `request`.
    pub fn url_for(&self, request: &ResourceRequest) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidRequest("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(request.segments());

        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query());
        }
        Ok(url)
    }
}

impl RemoteResource for HttpResource {
    fn fetch(&self, request: &ResourceRequest) -> BoxFuture<'static, Result<Value, RemoteError>> {
        let url = self.url_for(request);
        let client = self.client.clone();
        let api_key = self.api_key.clone();

        async move {
            let url = url?;
            tracing::debug!(url = %url, "Fetching remote resource");

            let mut builder = client.get(url).header(ACCEPT, "application/json");
            if let Some(key) = &api_key {
                builder = builder.header("apikey", key).bearer_auth(key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;

            if !status.is_success() {
                return Err(RemoteError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
        }
        .boxed()
    }
}
