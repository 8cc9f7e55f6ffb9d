// Resource request and response model.
// Defines the types the cache policy decides over.

use serde::{Deserialize, Serialize};

/// Classification of an intercepted request, mirroring browser fetch modes.
/// Only `Navigate` matters to the policy; everything else is a subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    #[default]
    NoCors,
    #[serde(other)]
    Unknown,
}

impl RequestMode {
    /// Whether this request is a top-level page load.
    pub fn is_navigation(&self) -> bool {
        matches!(self, RequestMode::Navigate)
    }
}

/// An intercepted resource request. Cache identity is `(method, url)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub mode: RequestMode,
}

impl Request {
    /// Create a GET request with the given mode.
    pub fn get(url: impl Into<String>, mode: RequestMode) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            mode,
        }
    }

    /// Create a top-level navigation request.
    pub fn navigation(url: impl Into<String>) -> Self {
        Self::get(url, RequestMode::Navigate)
    }

    /// Create a subresource (static asset) request.
    pub fn asset(url: impl Into<String>) -> Self {
        Self::get(url, RequestMode::NoCors)
    }

    /// Whether this request is a top-level page load.
    pub fn is_navigation(&self) -> bool {
        self.mode.is_navigation()
    }
}

/// A fetched or cached response. Opaque to the policy apart from status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
