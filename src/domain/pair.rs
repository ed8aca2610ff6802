//! Ordered currency pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered `(base, quote)` currency pair.
///
/// `base != quote` is enforced by the validator at the request boundary;
/// this type only carries the codes around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatePair {
    pub base: String,
    pub quote: String,
}

impl RatePair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        RatePair {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// The reversed twin of this pair. Its value is the reciprocal of this
    /// pair's value.
    pub fn reversed(&self) -> RatePair {
        RatePair {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

impl fmt::Display for RatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
