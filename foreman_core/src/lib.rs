// foreman_core: frame-driven construction task engine.
//
// This crate drives long-running construction orders for a real-time
// strategy agent: each order is a `ConstructionTask` state machine advanced
// by one step per simulation frame, competing with other tasks for currency,
// workers and build sites. It has no engine dependencies. The host supplies
// the game-facing collaborators through the traits in `services.rs` and
// `ledger.rs`, which keeps the whole engine testable headless.
//
// Module overview:
// - `scheduler.rs`: TaskScheduler, the per-frame dispatcher and host entry point.
// - `task.rs`:      ConstructionTask state machine, TaskState, FailureReason.
// - `event.rs`:     WorldEvent notifications + EventRouter (FIFO correlation).
// - `services.rs`:  WorkerPool / PlacementOracle / UnitControl contracts, Services bundle.
// - `ledger.rs`:    ResourceLedger contract + the move-only Reservation handle.
// - `command.rs`:   AgentCommand, the strategic layer's command form.
// - `config.rs`:    AgentConfig, all tunable parameters (JSON, serde defaults).
// - `profile.rs`:   UnitProfile, data-driven per-kind cost and timing.
// - `error.rs`:     ForemanError and LedgerError.
// - `types.rs`:     Positions, ids, Cost, Priority, UnitKind.
//
// **Critical constraint: determinism.** Given the same collaborator answers
// and the same notifications, a run makes the same decisions in the same
// order. No `HashMap`, no clocks, no randomness. Use `BTreeMap`.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod profile;
pub mod scheduler;
pub mod services;
pub mod task;
pub mod types;

#[cfg(test)]
pub mod testkit;
