//! Scheduling and the transactional apply protocol.

use super::{parse_update_id, RepoError};
use crate::domain::{AppliedRateUpdate, PendingRateUpdate};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

/// Repository owning the pending-update lifecycle.
pub struct RateUpdateRepository {
    pool: SqlitePool,
}

/// Row shape of the applied-updates payload handed to the database.
///
/// Values go through `Decimal`, which cannot represent `NaN` or `±∞`, so a
/// bad value fails encoding before any transaction is opened.
#[derive(Debug, Serialize)]
struct PayloadRow {
    update_id: Uuid,
    pair_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    value: Decimal,
}

impl RateUpdateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RateUpdateRepository { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ensures a pending update exists for the pair and returns its id.
    ///
    /// Idempotent while a pending row exists: the partial unique index on
    /// `(pair_id) WHERE status = 'pending'` makes concurrent callers resolve
    /// to the same row, whose existing id is returned via the no-op
    /// `DO UPDATE ... RETURNING`.
    pub async fn schedule_new_or_get_existing(
        &self,
        base: &str,
        quote: &str,
    ) -> Result<Uuid, RepoError> {
        // 1) ensure the pair row exists and get its id. The self-assignment
        //    makes RETURNING yield the id on conflict as well.
        let (pair_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO fx_pairs (base, quote) VALUES (?1, ?2)
            ON CONFLICT (base, quote) DO UPDATE SET base = excluded.base
            RETURNING id
            "#,
        )
        .bind(base)
        .bind(quote)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            RepoError::db(
                format!("failed to ensure pair {:?}/{:?}", base, quote),
                e,
            )
        })?;

        // 2) insert a fresh pending row, or fetch the existing update_id.
        let (raw_id,): (String,) = sqlx::query_as(
            r#"
            INSERT INTO fx_rate_updates (pair_id, update_id, status, updated_at)
            VALUES (?1, ?2, 'pending', ?3)
            ON CONFLICT (pair_id) WHERE status = 'pending'
            DO UPDATE SET update_id = update_id
            RETURNING update_id
            "#,
        )
        .bind(pair_id)
        .bind(Uuid::new_v4().to_string())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            RepoError::db(
                format!("failed to ensure an update for {:?}/{:?}", base, quote),
                e,
            )
        })?;

        parse_update_id(&raw_id)
    }

    /// All pending updates joined with their pair codes. Order unspecified;
    /// an empty result is a valid outcome.
    pub async fn get_pending(&self) -> Result<Vec<PendingRateUpdate>, RepoError> {
        let rows: Vec<(String, i64, String, String)> = sqlx::query_as(
            r#"
            SELECT fru.update_id, fru.pair_id, fp.base, fp.quote
            FROM fx_rate_updates fru JOIN fx_pairs fp ON fp.id = fru.pair_id
            WHERE fru.status = 'pending'
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::db("failed to query pending rates", e))?;

        rows.into_iter()
            .map(|(raw_id, pair_id, base, quote)| {
                Ok(PendingRateUpdate {
                    update_id: parse_update_id(&raw_id)?,
                    pair_id,
                    base,
                    quote,
                })
            })
            .collect()
    }

    /// Applies a resolved batch in one transaction: the matched update rows
    /// flip to `applied` with their value, and the latest-rate row per pair
    /// is upserted with the same value and timestamp.
    ///
    /// The batch is all-or-nothing. An input row whose `update_id` matches
    /// nothing simply updates zero rows. An empty batch is a no-op and opens
    /// no transaction.
    pub async fn apply_updates(&self, applied: &[AppliedRateUpdate]) -> Result<(), RepoError> {
        if applied.is_empty() {
            return Ok(());
        }

        let payload = encode_applied_payload(applied)?;
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::db("failed to begin transaction", e))?;

        sqlx::query(
            r#"
            UPDATE fx_rate_updates AS fru SET
                value = ir.value,
                updated_at = ?2,
                status = 'applied'
            FROM (
                SELECT json_extract(value, '$.update_id') AS update_id,
                       json_extract(value, '$.value') AS value
                FROM json_each(?1)
            ) AS ir
            WHERE fru.update_id = ir.update_id
            "#,
        )
        .bind(&payload)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::db("failed to apply update rows", e))?;

        sqlx::query(
            r#"
            INSERT INTO fx_last_rates (pair_id, value, updated_at)
            SELECT fru.pair_id, fru.value, ?2
            FROM json_each(?1) AS je
            JOIN fx_rate_updates AS fru
                ON fru.update_id = json_extract(je.value, '$.update_id')
            ON CONFLICT (pair_id) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&payload)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::db("failed to upsert latest rates", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::db("failed to commit transaction", e))
    }
}

fn encode_applied_payload(applied: &[AppliedRateUpdate]) -> Result<String, RepoError> {
    let mut rows = Vec::with_capacity(applied.len());
    for update in applied {
        let value = Decimal::try_from(update.value).map_err(|e| {
            RepoError::Payload(format!(
                "value {} for update {} is not representable: {}",
                update.value, update.update_id, e
            ))
        })?;
        rows.push(PayloadRow {
            update_id: update.update_id,
            pair_id: update.pair_id,
            value,
        });
    }

    serde_json::to_string(&rows).map_err(|e| RepoError::Payload(e.to_string()))
}
