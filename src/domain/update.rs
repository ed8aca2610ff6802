//! Scheduled rate updates and their lifecycle.

use super::RatePair;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of a scheduled rate update.
///
/// A pending update has no value yet; an applied update is terminal and its
/// value is also the latest value for the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Pending,
    Applied,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Pending => "pending",
            UpdateStatus::Applied => "applied",
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a stored status string that is neither `pending` nor `applied`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rate update status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for UpdateStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UpdateStatus::Pending),
            "applied" => Ok(UpdateStatus::Applied),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A scheduled update waiting for the refresh engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRateUpdate {
    pub update_id: Uuid,
    pub pair_id: i64,
    pub base: String,
    pub quote: String,
}

impl PendingRateUpdate {
    pub fn pair(&self) -> RatePair {
        RatePair::new(self.base.clone(), self.quote.clone())
    }
}

/// A resolved update ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRateUpdate {
    pub update_id: Uuid,
    pub pair_id: i64,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("pending".parse::<UpdateStatus>(), Ok(UpdateStatus::Pending));
        assert_eq!("applied".parse::<UpdateStatus>(), Ok(UpdateStatus::Applied));
        assert_eq!(UpdateStatus::Pending.as_str(), "pending");
        assert_eq!(UpdateStatus::Applied.as_str(), "applied");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "failed".parse::<UpdateStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("failed".to_string()));
        assert_eq!(err.to_string(), "unknown rate update status: \"failed\"");
    }

    #[test]
    fn test_applied_update_serde_round_trip() {
        let batch = vec![
            AppliedRateUpdate {
                update_id: Uuid::new_v4(),
                pair_id: 1,
                value: 0.9231,
            },
            AppliedRateUpdate {
                update_id: Uuid::new_v4(),
                pair_id: 2,
                value: 180.0,
            },
        ];

        let json = serde_json::to_string(&batch).unwrap();
        let decoded: Vec<AppliedRateUpdate> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, batch);
    }
}
