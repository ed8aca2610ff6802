//! Repository layer for database operations.
//!
//! Two repositories share the connection pool:
//! - `rates.rs` - read-only lookups of latest rates and scheduled updates
//! - `updates.rs` - scheduling and the transactional apply protocol

mod rates;
mod updates;

pub use rates::RateRepository;
pub use updates::RateUpdateRepository;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepoError {
    /// No latest rate or no update row for the lookup key. Passed through
    /// unwrapped so callers can match on it.
    #[error("rate not found")]
    RateNotFound,
    #[error("unknown rate update status: {0:?}")]
    UnknownStatus(String),
    #[error("stored update id is not a valid UUID: {0:?}")]
    CorruptUpdateId(String),
    /// The applied-updates batch could not be serialized; nothing was written.
    #[error("failed to encode applied updates: {0}")]
    Payload(String),
    #[error("{context}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },
}

impl RepoError {
    fn db(context: impl Into<String>, source: sqlx::Error) -> Self {
        RepoError::Database {
            context: context.into(),
            source,
        }
    }
}

fn parse_update_id(raw: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(raw).map_err(|_| RepoError::CorruptUpdateId(raw.to_string()))
}
