//! `PostgreSQL` seat ledger.

use crate::to_u32;
use futures::future::BoxFuture;
use seat_inventory_core::{CapacitySnapshot, CommitOutcome, LedgerError, SeatLedger, UnitId};
use sqlx::PgPool;

/// PostgreSQL-backed seat ledger.
///
/// Each unit is one row of `seat_units`. A commit is a single statement:
///
/// ```sql
/// UPDATE seat_units
///    SET confirmed_sold = confirmed_sold + $2
///  WHERE unit_key = $1 AND confirmed_sold + $2 <= total_capacity
/// RETURNING confirmed_sold
/// ```
///
/// Concurrent commits on the same row serialize on the row lock, and the
/// loser re-evaluates the `WHERE` clause against the winner's update, so no
/// interleaving can oversell. Nothing else in the engine locks the row.
#[derive(Clone, Debug)]
pub struct PostgresSeatLedger {
    pool: PgPool,
}

impl PostgresSeatLedger {
    /// Create a ledger over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Register a unit with `total` seats, or change the total of an existing
    /// unit. Existing sales are kept.
    ///
    /// Used by the catalog side when an event is published, and by tests.
    ///
    /// # Errors
    ///
    /// - `Inconsistent`: `total` is below the seats already sold
    /// - `Storage`: the statement failed
    pub async fn upsert_unit(&self, unit_id: UnitId, total: u32) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r"
            INSERT INTO seat_units (unit_key, event_id, category_id, total_capacity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (unit_key) DO UPDATE
            SET total_capacity = EXCLUDED.total_capacity, updated_at = now()
            WHERE seat_units.confirmed_sold <= EXCLUDED.total_capacity
            ",
        )
        .bind(unit_id.storage_key())
        .bind(*unit_id.event_id.as_uuid())
        .bind(unit_id.category_id.as_ref().map(|c| *c.as_uuid()))
        .bind(i64::from(total))
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::Inconsistent {
                unit_id,
                reason: format!("cannot shrink capacity to {total} below seats already sold"),
            });
        }

        tracing::info!(%unit_id, total, "Seat unit registered");
        Ok(())
    }

    async fn read(&self, unit_id: UnitId) -> Result<CapacitySnapshot, LedgerError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT total_capacity, confirmed_sold FROM seat_units WHERE unit_key = $1",
        )
        .bind(unit_id.storage_key())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let (total, sold) = row.ok_or(LedgerError::UnknownUnit(unit_id))?;
        Ok(CapacitySnapshot {
            total: to_u32(total, "total_capacity").map_err(LedgerError::Storage)?,
            confirmed_sold: to_u32(sold, "confirmed_sold").map_err(LedgerError::Storage)?,
        })
    }

    async fn commit(&self, unit_id: UnitId, quantity: u32) -> Result<CommitOutcome, LedgerError> {
        let sold: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE seat_units
            SET confirmed_sold = confirmed_sold + $2, updated_at = now()
            WHERE unit_key = $1 AND confirmed_sold + $2 <= total_capacity
            RETURNING confirmed_sold
            ",
        )
        .bind(unit_id.storage_key())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?;

        match sold {
            Some((sold,)) => Ok(CommitOutcome::Committed {
                confirmed_sold: to_u32(sold, "confirmed_sold").map_err(LedgerError::Storage)?,
            }),
            // Either the unit is unknown or it did not fit; the read tells which.
            None => {
                let capacity = self.read(unit_id).await?;
                Ok(CommitOutcome::InsufficientCapacity {
                    remaining: capacity.remaining(),
                })
            },
        }
    }

    async fn compensate(&self, unit_id: UnitId, quantity: u32) -> Result<(), LedgerError> {
        let updated: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE seat_units
            SET confirmed_sold = confirmed_sold - $2, updated_at = now()
            WHERE unit_key = $1 AND confirmed_sold >= $2
            RETURNING confirmed_sold
            ",
        )
        .bind(unit_id.storage_key())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::Storage(e.to_string()))?;

        if updated.is_some() {
            return Ok(());
        }

        let capacity = self.read(unit_id).await?;
        Err(LedgerError::Inconsistent {
            unit_id,
            reason: format!(
                "rollback of {quantity} exceeds {} confirmed sold",
                capacity.confirmed_sold
            ),
        })
    }
}

impl SeatLedger for PostgresSeatLedger {
    fn capacity(&self, unit_id: UnitId) -> BoxFuture<'_, Result<CapacitySnapshot, LedgerError>> {
        Box::pin(self.read(unit_id))
    }

    fn try_commit(
        &self,
        unit_id: UnitId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<CommitOutcome, LedgerError>> {
        Box::pin(self.commit(unit_id, quantity))
    }

    fn rollback(&self, unit_id: UnitId, quantity: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(self.compensate(unit_id, quantity))
    }
}
