//! Read models for rate lookups.

use chrono::{DateTime, Utc};

/// Latest applied rate for a pair, joined with the pair codes.
#[derive(Debug, Clone, PartialEq)]
pub struct Rate {
    pub pair_id: i64,
    pub base: String,
    pub quote: String,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

/// Row shape for looking up a scheduled update.
///
/// The value is present only once the update has been applied; a pending
/// update carries no numeric stand-in.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRate {
    pub pair_id: i64,
    pub base: String,
    pub quote: String,
    pub value: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// View returned for an update lookup, tagged by status.
#[derive(Debug, Clone, PartialEq)]
pub enum RateView {
    Pending {
        base: String,
        quote: String,
    },
    Applied {
        base: String,
        quote: String,
        value: f64,
        updated_at: DateTime<Utc>,
    },
}
