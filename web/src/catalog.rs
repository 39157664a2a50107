//! Unit registration.
//!
//! Publishing an event is owned by the catalog side; this hook is how it
//! tells the ledger that a unit exists and how many seats it has.

use futures::future::BoxFuture;
use seat_inventory_core::{LedgerError, UnitId};
use seat_inventory_postgres::PostgresSeatLedger;
use seat_inventory_runtime::InMemorySeatLedger;

/// Registers sellable units with the ledger backing the engine.
pub trait UnitCatalog: Send + Sync {
    /// Create `unit_id` with `total` seats, or resize it. Sales are kept.
    ///
    /// # Errors
    ///
    /// - `Inconsistent`: `total` is below the seats already sold
    /// - `Storage`: the ledger could not be written
    fn register(&self, unit_id: UnitId, total: u32) -> BoxFuture<'_, Result<(), LedgerError>>;
}

impl UnitCatalog for InMemorySeatLedger {
    fn register(&self, unit_id: UnitId, total: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(futures::future::ready(Self::register(self, unit_id, total)))
    }
}

impl UnitCatalog for PostgresSeatLedger {
    fn register(&self, unit_id: UnitId, total: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(self.upsert_unit(unit_id, total))
    }
}
