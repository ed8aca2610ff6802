//! Currency pair validation against the supported-code set.

use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("base currency is required")]
    BaseRequired,
    #[error("quote currency is required")]
    QuoteRequired,
    #[error("base and quote must be different")]
    SameCodes,
    #[error("base currency not supported")]
    BaseUnsupported,
    #[error("quote currency not supported")]
    QuoteUnsupported,
}

/// Validates currency pairs against an immutable supported set.
///
/// Inputs are expected to arrive already trimmed and uppercased; the
/// validator does not transform them.
pub struct CurrencyValidator {
    supported_codes: HashSet<String>,
    sorted_codes: Vec<String>,
}

impl CurrencyValidator {
    /// Takes ownership of the supported set, so later mutation by the caller
    /// cannot be observed. The sorted listing is computed once.
    pub fn new(supported_codes: HashSet<String>) -> Self {
        let mut sorted_codes: Vec<String> = supported_codes.iter().cloned().collect();
        sorted_codes.sort();

        CurrencyValidator {
            supported_codes,
            sorted_codes,
        }
    }

    /// Checks in order: base present, quote present, codes differ, base
    /// supported, quote supported.
    pub fn validate(&self, base: &str, quote: &str) -> Result<(), ValidationError> {
        if base.is_empty() {
            return Err(ValidationError::BaseRequired);
        }
        if quote.is_empty() {
            return Err(ValidationError::QuoteRequired);
        }
        if base == quote {
            return Err(ValidationError::SameCodes);
        }
        if !self.supported_codes.contains(base) {
            return Err(ValidationError::BaseUnsupported);
        }
        if !self.supported_codes.contains(quote) {
            return Err(ValidationError::QuoteUnsupported);
        }
        Ok(())
    }

    /// Returns a fresh sorted copy of the supported codes.
    pub fn supported_codes(&self) -> Vec<String> {
        self.sorted_codes.clone()
    }
}
