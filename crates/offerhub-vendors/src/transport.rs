use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::VendorError;

/// The opaque request/response boundary to one vendor backend: hand it a
/// SKU, get back a raw body for the matching adapter to parse.
#[async_trait]
pub trait VendorTransport: Send + Sync {
    /// Fetch the raw response body for `sku`.
    ///
    /// # Errors
    ///
    /// Returns `VendorError` on transport failure, timeout, or a non-2xx
    /// response.
    async fn fetch(&self, sku: &str) -> Result<String, VendorError>;
}

/// Build the HTTP client shared by every vendor transport. The request
/// timeout is the per-call budget; a slower vendor counts as failed.
///
/// # Errors
///
/// Returns `VendorError::Http` if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client, VendorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(VendorError::Http)
}

/// JSON-over-HTTP transport: `GET {base_url}/products/{sku}`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn product_url(&self, sku: &str) -> String {
        format!("{}/products/{}", self.base_url, sku)
    }
}

#[async_trait]
impl VendorTransport for HttpTransport {
    async fn fetch(&self, sku: &str) -> Result<String, VendorError> {
        let url = self.product_url(sku);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VendorError::NotFound { url });
        }
        if !status.is_success() {
            return Err(VendorError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.text().await?)
    }
}
