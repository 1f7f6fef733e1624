// Error types for the task engine.
//
// Transient denials (no money yet, no idle worker, site rejected) are not
// errors: they keep a task in its current state and never reach this file.
// What does live here is what a host can get wrong (`ForemanError`) and
// what a collaborator can get wrong (`LedgerError`). A task that fails
// mid-flight carries a `FailureReason` instead; see `task.rs`.

use crate::types::{Cost, TaskId, UnitKind};
use thiserror::Error;

/// Host-facing error for scheduler and config operations.
#[derive(Debug, Error)]
pub enum ForemanError {
    #[error("no profile configured for {0:?}")]
    UnknownUnitKind(UnitKind),

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("invalid agent config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForemanError>;

/// Contract violations reported by a `ResourceLedger`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("release of {cost} exceeds reserved {reserved}")]
    UnmatchedRelease { cost: Cost, reserved: Cost },
}
