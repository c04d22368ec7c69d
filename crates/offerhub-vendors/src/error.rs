use thiserror::Error;

/// Failure modes of a single vendor call. None of these surface past the
/// fan-out: a failed vendor drops out of the offer set.
#[derive(Debug, Error)]
pub enum VendorError {
    /// Transport-level failure: connect error, timeout, protocol error.
    #[error("vendor request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The vendor does not recognize the SKU.
    #[error("no listing at {url}")]
    NotFound { url: String },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Body did not match the schema the roster declares for this vendor.
    #[error("failed to decode {context}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Short-circuited by the breaker; the vendor was never called.
    #[error("circuit open for vendor {vendor_id}")]
    CircuitOpen { vendor_id: String },
}

impl VendorError {
    pub(crate) fn deserialize(context: &str, source: serde_json::Error) -> Self {
        VendorError::Deserialize {
            context: context.to_string(),
            source,
        }
    }

    /// Whether retrying the call could plausibly succeed. Timeouts, connect
    /// errors, 5xx, and 429 are transient; schema mismatches and other 4xx
    /// are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            VendorError::Http(source) => source.is_timeout() || source.is_connect(),
            VendorError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            VendorError::NotFound { .. }
            | VendorError::Deserialize { .. }
            | VendorError::CircuitOpen { .. } => false,
        }
    }
}
