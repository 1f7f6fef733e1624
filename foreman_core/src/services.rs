// Collaborator contracts the task engine depends on, and the per-frame
// bundle that hands them to the scheduler.
//
// The engine owns none of these. The host implements them on top of the
// game API (or, in tests, on top of a fake engine) and passes them in every
// frame as a `Services` bundle of borrowed trait objects. There is no ambient
// global state: a task only touches a pool while the scheduler is running
// its `update()` or `cancel()`.
//
// - `WorkerPool`: idle/busy labor units. Acquire one by capability near a
//   location; give it back explicitly.
// - `PlacementOracle`: suggests a concrete build tile near an approximate
//   one, and revalidates a tile right before the build order goes out.
// - `UnitControl`: the engine's command channel (including withdrawing an
//   order on cancellation) and the few unit queries the state machine needs.
//
// The currency ledger lives in `ledger.rs` because its reservation handle
// carries extra structure.

use crate::config::AgentConfig;
use crate::ledger::ResourceLedger;
use crate::types::{Position, TilePosition, UnitId, UnitKind};
use serde::{Deserialize, Serialize};

/// Labor units (and producer structures) available for tasks.
pub trait WorkerPool {
    /// Mark and return the idle unit of kind `capability` nearest `near`,
    /// or `None` if every capable unit is busy.
    fn acquire(&mut self, capability: UnitKind, near: Position) -> Option<UnitId>;

    /// Return a unit acquired earlier. Releasing a unit the pool no longer
    /// knows (e.g. it died) must be tolerated.
    fn release(&mut self, worker: UnitId);
}

/// Build-site selection and validation.
pub trait PlacementOracle {
    /// A concrete tile for `kind` close to `near`, or `None` if nothing fits
    /// right now.
    fn resolve(&self, kind: UnitKind, near: TilePosition) -> Option<TilePosition>;

    /// Whether `worker` can start `kind` at `at` right now.
    fn is_valid(&self, kind: UnitKind, at: TilePosition, worker: UnitId) -> bool;
}

/// The order a unit is currently executing, as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Idle,
    Move(Position),
    Build { kind: UnitKind, at: TilePosition },
    Train(UnitKind),
}

/// Unit queries and the command channel.
///
/// `issue_*` return whether the engine accepted the command. Rejection is a
/// transient denial, not an error.
pub trait UnitControl {
    /// Current position, or `None` if the unit no longer exists.
    fn position(&self, unit: UnitId) -> Option<Position>;

    fn current_order(&self, unit: UnitId) -> Option<Order>;

    fn issue_move(&mut self, unit: UnitId, to: Position) -> bool;

    fn issue_build(&mut self, unit: UnitId, kind: UnitKind, at: TilePosition) -> bool;

    fn issue_train(&mut self, producer: UnitId, kind: UnitKind) -> bool;

    /// Stop `unit` and withdraw its build or train order, abandoning an
    /// entity it has started but not finished. Returns whether the unit
    /// still exists.
    fn halt(&mut self, unit: UnitId) -> bool;

    /// Abandon an unfinished entity. The engine refunds its price. Returns
    /// false if the entity is gone or already finished.
    fn cancel_construction(&mut self, entity: UnitId) -> bool;

    /// Frames left until `entity` finishes construction.
    fn remaining_build_time(&self, entity: UnitId) -> Option<u32>;
}

/// Everything a task may touch during one frame.
pub struct Services<'a> {
    pub config: &'a AgentConfig,
    pub ledger: &'a mut dyn ResourceLedger,
    pub workers: &'a mut dyn WorkerPool,
    pub placement: &'a dyn PlacementOracle,
    pub units: &'a mut dyn UnitControl,
}
