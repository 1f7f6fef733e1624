// Resource ledger contract and the reservation handle.
//
// The ledger itself (how currency income is tracked, what counts as
// available) belongs to the host. The engine only needs two calls:
// `reserve` and `release`. A reservation is a committed hold on currency
// that the engine releases once the game itself has deducted the price,
// which happens when the constructed entity starts materializing.
//
// Tasks never call the trait methods directly. `reserve()` wraps a granted
// hold in a `Reservation`, which is neither `Clone` nor `Copy`, and
// `settle()` consumes it. A task stores `Option<Reservation>` and can only
// release by `take()`-ing it, so reserving twice or releasing twice does not
// type-check into existence.

use crate::error::LedgerError;
use crate::types::Cost;
use serde::Serialize;

/// Shared currency pools, as seen by the engine.
pub trait ResourceLedger {
    /// Atomically commit `cost` if both amounts are currently available.
    /// `false` means "try again next frame".
    fn reserve(&mut self, cost: Cost) -> bool;

    /// Return a hold previously granted by `reserve`. Releasing more than is
    /// held is a contract violation.
    fn release(&mut self, cost: Cost) -> Result<(), LedgerError>;
}

/// Proof of a granted hold. Must be passed to `settle()` exactly once.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Reservation {
    cost: Cost,
}

impl Reservation {
    pub fn cost(&self) -> Cost {
        self.cost
    }
}

/// Ask the ledger for `cost`. Returns the handle on success.
pub fn reserve<L: ResourceLedger + ?Sized>(ledger: &mut L, cost: Cost) -> Option<Reservation> {
    ledger.reserve(cost).then_some(Reservation { cost })
}

/// Release a hold, consuming its handle.
pub fn settle<L: ResourceLedger + ?Sized>(
    ledger: &mut L,
    reservation: Reservation,
) -> Result<(), LedgerError> {
    ledger.release(reservation.cost)
}
