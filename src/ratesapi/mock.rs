//! Mock rate client for testing without network calls.

use super::{RateClient, RateClientError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Mock rate client that returns predefined conversion tables.
///
/// A base without a canned table fails with an upstream-style error, which
/// models a failing external API for that currency. An optional delay models
/// a slow upstream.
#[derive(Debug, Default)]
pub struct MockRateClient {
    rates: HashMap<String, HashMap<String, f64>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockRateClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conversion table for `base`.
    pub fn with_rates(mut self, base: &str, rates: &[(&str, f64)]) -> Self {
        self.rates.insert(
            base.to_string(),
            rates
                .iter()
                .map(|(quote, value)| (quote.to_string(), *value))
                .collect(),
        );
        self
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Bases requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }
}

#[async_trait]
impl RateClient for MockRateClient {
    async fn get_rates_for_base(
        &self,
        base: &str,
    ) -> Result<HashMap<String, f64>, RateClientError> {
        match self.calls.lock() {
            Ok(mut guard) => guard.push(base.to_string()),
            Err(poison) => poison.into_inner().push(base.to_string()),
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.rates
            .get(base)
            .cloned()
            .ok_or_else(|| RateClientError::Status {
                status: 500,
                base: base.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_canned_rates() {
        let client = MockRateClient::new().with_rates("USD", &[("EUR", 0.9), ("JPY", 148.0)]);

        let rates = client.get_rates_for_base("USD").await.unwrap();
        assert_eq!(rates["EUR"], 0.9);
        assert_eq!(rates["JPY"], 148.0);
    }

    #[tokio::test]
    async fn test_unknown_base_fails() {
        let client = MockRateClient::new();
        assert!(client.get_rates_for_base("USD").await.is_err());
    }

    #[tokio::test]
    async fn test_records_calls() {
        let client = MockRateClient::new().with_rates("USD", &[("EUR", 0.9)]);

        let _ = client.get_rates_for_base("USD").await;
        let _ = client.get_rates_for_base("GBP").await;

        assert_eq!(client.calls(), vec!["USD", "GBP"]);
    }
}
