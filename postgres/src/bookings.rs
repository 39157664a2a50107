//! `PostgreSQL` booking store.

use crate::to_u32;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use seat_inventory_core::{
    Booking, BookingId, BookingLine, BookingStore, BookingStoreError, CategoryId, EventId,
    HolderId, Money, UnitId,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

/// `SQLSTATE` for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed, append-only booking store.
///
/// A booking row and all of its lines are written in one transaction, so a
/// reader never sees a partial booking.
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

fn storage(e: impl std::fmt::Display) -> BookingStoreError {
    BookingStoreError::Storage(e.to_string())
}

fn cents_to_i64(money: Money) -> Result<i64, BookingStoreError> {
    i64::try_from(money.cents())
        .map_err(|_| BookingStoreError::Storage(format!("amount {money} exceeds BIGINT")))
}

fn cents_from_i64(value: i64, column: &str) -> Result<Money, BookingStoreError> {
    u64::try_from(value)
        .map(Money::from_cents)
        .map_err(|_| BookingStoreError::Storage(format!("{column} is negative: {value}")))
}

impl PostgresBookingStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(&self, booking: &Booking) -> Result<(), BookingStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let inserted = sqlx::query(
            r"
            INSERT INTO bookings (booking_id, holder_id, owner_ref, total_amount_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(*booking.booking_id.as_uuid())
        .bind(booking.holder_id.as_str())
        .bind(booking.owner.as_deref())
        .bind(cents_to_i64(booking.total_amount)?)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let duplicate = e
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            return Err(if duplicate {
                BookingStoreError::Duplicate(booking.booking_id)
            } else {
                storage(e)
            });
        }

        for (line_no, line) in (0_i32..).zip(&booking.lines) {
            sqlx::query(
                r"
                INSERT INTO booking_lines
                    (booking_id, line_no, unit_key, event_id, category_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(*booking.booking_id.as_uuid())
            .bind(line_no)
            .bind(line.unit_id.storage_key())
            .bind(*line.unit_id.event_id.as_uuid())
            .bind(line.unit_id.category_id.map(|c| *c.as_uuid()))
            .bind(i64::from(line.quantity))
            .bind(cents_to_i64(line.unit_price)?)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        tracing::debug!(
            booking_id = %booking.booking_id,
            lines = booking.lines.len(),
            "Booking persisted"
        );
        Ok(())
    }

    async fn load(&self, booking_id: BookingId) -> Result<Option<Booking>, BookingStoreError> {
        let row = sqlx::query(
            r"
            SELECT booking_id, holder_id, owner_ref, total_amount_cents, created_at
            FROM bookings
            WHERE booking_id = $1
            ",
        )
        .bind(*booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut bookings = self.assemble(vec![row]).await?;
        Ok(bookings.pop())
    }

    async fn load_for_unit(&self, unit_id: UnitId) -> Result<Vec<Booking>, BookingStoreError> {
        let rows = sqlx::query(
            r"
            SELECT b.booking_id, b.holder_id, b.owner_ref, b.total_amount_cents, b.created_at
            FROM bookings b
            WHERE EXISTS (
                SELECT 1 FROM booking_lines l
                WHERE l.booking_id = b.booking_id AND l.unit_key = $1
            )
            ORDER BY b.created_at ASC, b.booking_id ASC
            ",
        )
        .bind(unit_id.storage_key())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        self.assemble(rows).await
    }

    /// Attach lines to booking rows, preserving row order.
    async fn assemble(&self, rows: Vec<PgRow>) -> Result<Vec<Booking>, BookingStoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get("booking_id"))
            .collect::<Result<_, _>>()
            .map_err(storage)?;

        let line_rows = sqlx::query(
            r"
            SELECT booking_id, event_id, category_id, quantity, unit_price_cents
            FROM booking_lines
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, line_no
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut lines: HashMap<Uuid, Vec<BookingLine>> = HashMap::new();
        for row in &line_rows {
            let booking_id: Uuid = row.try_get("booking_id").map_err(storage)?;
            lines.entry(booking_id).or_default().push(line_from_row(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("booking_id").map_err(storage)?;
                booking_from_row(row, lines.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

fn line_from_row(row: &PgRow) -> Result<BookingLine, BookingStoreError> {
    let event_id: Uuid = row.try_get("event_id").map_err(storage)?;
    let category_id: Option<Uuid> = row.try_get("category_id").map_err(storage)?;
    let quantity: i64 = row.try_get("quantity").map_err(storage)?;
    let unit_price: i64 = row.try_get("unit_price_cents").map_err(storage)?;

    let event_id = EventId::from_uuid(event_id);
    Ok(BookingLine {
        unit_id: match category_id {
            Some(category_id) => UnitId::category(event_id, CategoryId::from_uuid(category_id)),
            None => UnitId::event(event_id),
        },
        quantity: to_u32(quantity, "quantity").map_err(BookingStoreError::Storage)?,
        unit_price: cents_from_i64(unit_price, "unit_price_cents")?,
    })
}

fn booking_from_row(row: &PgRow, lines: Vec<BookingLine>) -> Result<Booking, BookingStoreError> {
    let booking_id: Uuid = row.try_get("booking_id").map_err(storage)?;
    let holder_id: String = row.try_get("holder_id").map_err(storage)?;
    let owner: Option<String> = row.try_get("owner_ref").map_err(storage)?;
    let total: i64 = row.try_get("total_amount_cents").map_err(storage)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(storage)?;

    Ok(Booking {
        booking_id: BookingId::from_uuid(booking_id),
        holder_id: HolderId::new(holder_id),
        owner,
        lines,
        total_amount: cents_from_i64(total, "total_amount_cents")?,
        created_at,
    })
}

impl BookingStore for PostgresBookingStore {
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<(), BookingStoreError>> {
        Box::pin(self.write(booking))
    }

    fn get(&self, booking_id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, BookingStoreError>> {
        Box::pin(self.load(booking_id))
    }

    fn bookings_for_unit(
        &self,
        unit_id: UnitId,
    ) -> BoxFuture<'_, Result<Vec<Booking>, BookingStoreError>> {
        Box::pin(self.load_for_unit(unit_id))
    }
}
