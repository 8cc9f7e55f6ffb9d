// HTTP network backend.
// Thin reqwest wrapper that turns transport failures into errors and
// passes HTTP-level failures (404, 500) through as ordinary responses.

use reqwest::{
    Client, Method,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::debug;

use crate::error::{AirlockError, Result};
use crate::gateway::NetworkBackend;
use crate::resource::{Request, Response};

/// Network backend backed by a shared reqwest client.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new client sending the given user agent on every request.
    pub fn new(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|e| AirlockError::Other(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(AirlockError::Network)?;

        Ok(Self { client })
    }

    async fn execute(&self, request: &Request) -> Result<Response> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| AirlockError::InvalidMethod(request.method.clone()))?;

        let response = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(AirlockError::Network)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(AirlockError::Network)?
            .to_vec();

        debug!(url = %request.url, status, "network fetch completed");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

impl NetworkBackend for HttpClient {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.execute(request).await
    }
}
