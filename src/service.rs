//! Schedule/lookup façade composing the cache and repositories.

use crate::cache::RateUpdateCache;
use crate::db::repo::{RateRepository, RateUpdateRepository, RepoError};
use crate::domain::{Rate, RatePair, RateView, UpdateStatus};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    /// An applied row without a value; the schema forbids this, so hitting it
    /// means the storage is inconsistent.
    #[error("applied update {0} has no value")]
    MissingValue(Uuid),
}

pub struct RateService {
    update_repo: Arc<RateUpdateRepository>,
    rate_repo: Arc<RateRepository>,
    cache: Arc<dyn RateUpdateCache>,
}

impl RateService {
    pub fn new(
        update_repo: Arc<RateUpdateRepository>,
        rate_repo: Arc<RateRepository>,
        cache: Arc<dyn RateUpdateCache>,
    ) -> Self {
        RateService {
            update_repo,
            rate_repo,
            cache,
        }
    }

    /// Ensures a pending update exists for the pair and returns its id.
    ///
    /// The cache is probed first; a hit skips the database entirely. Two
    /// concurrent callers racing past a cold cache both land on the
    /// repository upsert and resolve to the same id.
    pub async fn schedule_update(&self, base: &str, quote: &str) -> Result<Uuid, ServiceError> {
        let pair = RatePair::new(base, quote);
        if let Some(cached_id) = self.cache.get(&pair) {
            return Ok(cached_id);
        }

        let update_id = self
            .update_repo
            .schedule_new_or_get_existing(base, quote)
            .await?;

        self.cache.set(pair, update_id);
        Ok(update_id)
    }

    /// Looks up an update and shapes the view by its status.
    pub async fn get_by_update_id(&self, update_id: Uuid) -> Result<RateView, ServiceError> {
        let (rate, status) = self.rate_repo.get_by_update_id(update_id).await?;

        match status {
            UpdateStatus::Applied => Ok(RateView::Applied {
                base: rate.base,
                quote: rate.quote,
                value: rate.value.ok_or(ServiceError::MissingValue(update_id))?,
                updated_at: rate.updated_at,
            }),
            UpdateStatus::Pending => Ok(RateView::Pending {
                base: rate.base,
                quote: rate.quote,
            }),
        }
    }

    /// Latest applied rate for a pair.
    pub async fn get_by_codes(&self, base: &str, quote: &str) -> Result<Rate, ServiceError> {
        Ok(self.rate_repo.get_by_codes(base, quote).await?)
    }
}
