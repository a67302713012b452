use crate::domain::model::{Customer, Lookup, RoutingKey, Selector};
use crate::domain::ports::CustomerProvider;
use crate::utils::error::{ProviderError, Result, RouterError};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Fetches customers from a remote service at `GET <endpoint>/<id>`.
///
/// 200 carries a `{id, name}` body, 404 means the customer does not exist,
/// anything else is a backend failure.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    selector: Selector,
    endpoint: Url,
    client: Client,
}

impl HttpProvider {
    /// Largest customer payload accepted from a backend.
    pub const MAX_BODY_BYTES: usize = 64 * 1024;

    pub fn new(selector: Selector, endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let field = format!("backends.{}.endpoint", selector);
        validate_url(&field, endpoint)?;
        let endpoint = Url::parse(endpoint).map_err(|e| RouterError::InvalidConfigValueError {
            field: field.clone(),
            value: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| RouterError::ConfigurationError {
            message: format!("cannot build http client for '{}': {}", selector, e),
        })?;

        Ok(Self {
            selector,
            endpoint,
            client,
        })
    }

    fn customer_url(&self, key: &RoutingKey) -> std::result::Result<Url, ProviderError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Unavailable(format!("endpoint {} cannot take a path", self.endpoint))
            })?
            .pop_if_empty()
            .push(key.as_str());
        Ok(url)
    }
}

#[async_trait]
impl CustomerProvider for HttpProvider {
    async fn lookup(&self, key: &RoutingKey) -> std::result::Result<Lookup, ProviderError> {
        let url = self.customer_url(key)?;
        tracing::debug!("Requesting {} from '{}'", url, self.selector);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!("Backend '{}' answered {}", self.selector, status);

        if status == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = read_capped(response, Self::MAX_BODY_BYTES).await?;
        let mut customer: Customer = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::InvalidPayload(e.to_string()))?;
        customer.source = Some(self.selector.clone());
        Ok(Lookup::Found(customer))
    }

    fn describe(&self) -> String {
        format!("http({})", self.endpoint)
    }
}

// 分段讀取，超過上限立即中止，不依賴後端誠實回報 Content-Length
async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> std::result::Result<Vec<u8>, ProviderError> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(too_large(length, limit));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(too_large((body.len() + chunk.len()) as u64, limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn too_large(seen: u64, limit: usize) -> ProviderError {
    ProviderError::InvalidPayload(format!(
        "response body of at least {} bytes exceeds the {} byte limit",
        seen, limit
    ))
}
