//! Remote resource abstraction.
//!
//! The resilience layers only ever see an operation factory. This module is
//! the narrow seam through which a concrete backend supplies one.

use futures_util::future::BoxFuture;
use serde_json::Value;
use url::form_urlencoded;

use crate::remote::error::RemoteError;
use crate::security::sanitize::{sanitize_input, sanitize_path_segment, DEFAULT_MAX_INPUT_LEN};

/// A read request for one remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourceRequest {
    /// Build a request from a `/`-separated path. Every segment is sanitized.
    pub fn new(path: &str) -> Result<Self, RemoteError> {
        let mut segments = Vec::new();
        for raw in path.split('/').filter(|s| !s.trim().is_empty()) {
            let segment = sanitize_path_segment(raw);
            if segment.is_empty() {
                return Err(RemoteError::InvalidRequest(format!(
                    "path segment '{}' has no usable characters",
                    raw
                )));
            }
            segments.push(segment);
        }

        if segments.is_empty() {
            return Err(RemoteError::InvalidRequest("empty resource path".to_string()));
        }

        Ok(Self {
            segments,
            query: Vec::new(),
        })
    }

    /// Append a query parameter. Key and value are sanitized; empty keys are dropped.
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        let key = sanitize_path_segment(key);
        if !key.is_empty() {
            self.query.push((key, sanitize_input(value, DEFAULT_MAX_INPUT_LEN)));
        }
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Identity used for request de-duplication.
    ///
    /// Query parameters are sorted so that parameter order does not split
    /// otherwise identical requests, then form-encoded so that a `&` or `=`
    /// inside a value cannot alias a different parameter list.
    pub fn flight_key(&self) -> String {
        let mut key = self.segments.join("/");
        if !self.query.is_empty() {
            let mut params = self.query.clone();
            params.sort();
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&params)
                .finish();
            key.push('?');
            key.push_str(&encoded);
        }
        key
    }
}

/// A backend capable of fetching a resource as JSON.
pub trait RemoteResource: Send + Sync {
    fn fetch(&self, request: &ResourceRequest) -> BoxFuture<'static, Result<Value, RemoteError>>;
}
