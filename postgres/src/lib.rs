//! `PostgreSQL` storage for the seat inventory engine.
//!
//! This crate provides the production implementations of the
//! [`SeatLedger`](seat_inventory_core::SeatLedger) and
//! [`BookingStore`](seat_inventory_core::BookingStore) traits:
//!
//! - [`PostgresSeatLedger`]: one row per unit, committed with a single
//!   conditional `UPDATE`
//! - [`PostgresBookingStore`]: bookings and their lines written in one
//!   transaction
//!
//! # Example
//!
//! ```ignore
//! use seat_inventory_postgres::{connect, migrate, PostgresSeatLedger, PostgresBookingStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/seats", 10, Duration::from_secs(5)).await?;
//!     migrate(&pool).await?;
//!
//!     let ledger = PostgresSeatLedger::new(pool.clone());
//!     ledger.upsert_unit(unit, 500).await?;
//!     let bookings = PostgresBookingStore::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bookings;
mod ledger;

pub use bookings::PostgresBookingStore;
pub use ledger::PostgresSeatLedger;

use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Open a connection pool.
///
/// # Errors
///
/// Returns the sqlx error if the database cannot be reached within
/// `connect_timeout`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connect_timeout)
        .connect(database_url)
        .await
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns [`MigrateError`] if a migration fails or the recorded migration
/// history does not match the embedded one.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Seat inventory migrations applied");
    Ok(())
}

fn to_u32(value: i64, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} out of range: {value}"))
}
