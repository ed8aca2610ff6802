//! Read-only rate lookups.

use super::RepoError;
use crate::domain::{Rate, UpdateRate, UpdateStatus};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

/// Repository for reading applied rates and scheduled updates.
///
/// Both lookups round the value to 4 decimal places at query time; the
/// stored value keeps full precision.
pub struct RateRepository {
    pool: SqlitePool,
}

impl RateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RateRepository { pool }
    }

    /// Latest applied rate for a pair.
    ///
    /// # Errors
    /// `RepoError::RateNotFound` when the pair has no applied rate yet; any
    /// other database failure is wrapped with the pair codes.
    pub async fn get_by_codes(&self, base: &str, quote: &str) -> Result<Rate, RepoError> {
        let row: Option<(i64, String, String, f64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT fp.id, fp.base, fp.quote, round(flr.value, 4), flr.updated_at
            FROM fx_last_rates flr JOIN fx_pairs fp ON flr.pair_id = fp.id
            WHERE fp.base = ?1 AND fp.quote = ?2
            "#,
        )
        .bind(base)
        .bind(quote)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            RepoError::db(
                format!("failed to select rate for pair {:?}/{:?}", base, quote),
                e,
            )
        })?;

        let (pair_id, base, quote, value, updated_at) = row.ok_or(RepoError::RateNotFound)?;
        Ok(Rate {
            pair_id,
            base,
            quote,
            value,
            updated_at,
        })
    }

    /// Scheduled update by its id, along with the update status.
    ///
    /// The value is selected only for applied rows; a pending row yields no
    /// value at all.
    pub async fn get_by_update_id(
        &self,
        update_id: Uuid,
    ) -> Result<(UpdateRate, UpdateStatus), RepoError> {
        let row: Option<(i64, String, String, Option<f64>, DateTime<Utc>, String)> =
            sqlx::query_as(
                r#"
                SELECT fp.id,
                       fp.base,
                       fp.quote,
                       CASE WHEN fru.status = 'applied' THEN round(fru.value, 4) END,
                       fru.updated_at,
                       fru.status
                FROM fx_rate_updates fru JOIN fx_pairs fp ON fru.pair_id = fp.id
                WHERE fru.update_id = ?1
                "#,
            )
            .bind(update_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                RepoError::db(
                    format!("failed to select rate for update ID {:?}", update_id),
                    e,
                )
            })?;

        let (pair_id, base, quote, value, updated_at, status) =
            row.ok_or(RepoError::RateNotFound)?;
        let status: UpdateStatus = status
            .parse()
            .map_err(|e: crate::domain::UnknownStatus| RepoError::UnknownStatus(e.0))?;

        Ok((
            UpdateRate {
                pair_id,
                base,
                quote,
                value,
                updated_at,
            },
            status,
        ))
    }
}
