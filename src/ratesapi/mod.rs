//! External rate API abstraction.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod client;
pub mod mock;

pub use client::ExchangeRateClient;
pub use mock::MockRateClient;

/// Capability for fetching the conversion table of one base currency.
///
/// Implementations do not retry; a failed base is simply retried on the next
/// refresh tick.
#[async_trait]
pub trait RateClient: Send + Sync {
    /// Fetch all known rates for `base`, keyed by quote code.
    async fn get_rates_for_base(
        &self,
        base: &str,
    ) -> Result<HashMap<String, f64>, RateClientError>;
}

#[derive(Debug, Error)]
pub enum RateClientError {
    #[error("failed to execute request for currency {base:?}: {source}")]
    Request {
        base: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} for currency {base:?}")]
    Status { status: u16, base: String },
    #[error("failed to decode response for currency {base:?}: {source}")]
    Decode {
        base: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("api returned non-success result {result:?} for currency {base:?}")]
    NonSuccess { base: String, result: String },
    #[error("api returned no conversion rates for currency {base:?}")]
    EmptyRates { base: String },
}
