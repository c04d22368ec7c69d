pub mod aggregator;
pub mod circuit;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod transport;
pub mod types;

pub use aggregator::{FanOutAggregator, VendorPipeline};
pub use circuit::{CircuitBreaker, CircuitBreakerConfig};
pub use error::VendorError;
pub use normalize::{normalize, parse_payload};
pub use retry::RetryPolicy;
pub use transport::{build_http_client, HttpTransport, VendorTransport};
pub use types::{LegacyPayload, RetailPayload, VendorPayload, WarehousePayload};
