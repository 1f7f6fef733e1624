// Test-only game engine for end-to-end task scenarios.
//
// Couples the real `TaskScheduler` (from `foreman_core::scheduler`) with a
// deterministic `FakeEngine` that implements every collaborator contract,
// and exposes a synchronous, frame-stepping API for the integration tests:
// spawn units → create tasks → run frames → destroy things → check reports.
//
// One `run_frame()` mirrors a real host frame: the engine simulates the
// frame and hands over the notifications that became due, the notifications
// are pushed into the scheduler, and the scheduler ticks with the engine's
// collaborators lent as `Services`.
//
// Module overview:
// - `engine.rs`:    FakeEngine, movement, build/train execution, timers.
// - `stockpile.rs`: ResourceLedger over a mineral/gas bank.
// - `roster.rs`:    WorkerPool, nearest idle unit by kind.
// - `terrain.rs`:   PlacementOracle over a tile grid with footprints.
// - `units.rs`:     UnitControl, the unit table and command channel.
// - `queue.rs`:     `(frame, sequence)` min-heap of delayed notifications.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

pub mod engine;
pub mod queue;
pub mod roster;
pub mod stockpile;
pub mod terrain;
pub mod units;

use engine::FakeEngine;
use foreman_core::config::AgentConfig;
use foreman_core::error::Result;
use foreman_core::scheduler::{RetiredTask, TaskScheduler, TickReport};
use foreman_core::task::{TaskState, Transition};
use foreman_core::types::{Cost, Position, Priority, TaskId, TilePosition, UnitId, UnitKind};

/// Install a `tracing` subscriber that writes through the test harness.
/// Filter with `RUST_LOG` (e.g. `RUST_LOG=foreman_core=debug`). Safe to call
/// from every test.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub engine: FakeEngine,
    pub scheduler: TaskScheduler,
    /// Every tick report so far, oldest first.
    pub reports: Vec<TickReport>,
}

impl Harness {
    pub fn new(config: AgentConfig, bank: Cost) -> Self {
        init_tracing();
        Self {
            engine: FakeEngine::new(config, bank),
            scheduler: TaskScheduler::new(),
            reports: Vec::new(),
        }
    }

    pub fn spawn(&mut self, kind: UnitKind, position: Position) -> UnitId {
        self.engine.spawn(kind, position)
    }

    pub fn create_task(
        &mut self,
        target: UnitKind,
        location: TilePosition,
        exact: bool,
    ) -> Result<TaskId> {
        self.scheduler
            .create_task(&self.engine.config, target, Priority::Normal, location, exact)
    }

    pub fn cancel(&mut self, id: TaskId) -> Result<()> {
        self.scheduler.cancel(id)
    }

    pub fn destroy(&mut self, unit: UnitId) -> bool {
        self.engine.destroy(unit)
    }

    /// Simulate one engine frame and tick the scheduler once.
    pub fn run_frame(&mut self) -> &TickReport {
        for event in self.engine.advance() {
            self.scheduler.notify(event);
        }
        let mut services = self.engine.services();
        let report = self.scheduler.tick(&mut services);
        self.reports.push(report);
        let last = self.reports.len() - 1;
        &self.reports[last]
    }

    /// Run frames until `done` holds or `max_frames` pass. Returns whether
    /// `done` held.
    pub fn run_until(&mut self, max_frames: u32, mut done: impl FnMut(&Harness) -> bool) -> bool {
        for _ in 0..max_frames {
            if done(self) {
                return true;
            }
            self.run_frame();
        }
        done(self)
    }

    /// Run until task `id` is in `state`.
    pub fn run_until_state(&mut self, id: TaskId, state: &TaskState, max_frames: u32) -> bool {
        self.run_until(max_frames, |h| h.state(id).as_ref() == Some(state))
    }

    /// Run until task `id` has retired.
    pub fn run_until_retired(&mut self, id: TaskId, max_frames: u32) -> Option<RetiredTask> {
        self.run_until(max_frames, |h| h.retirement(id).is_some());
        self.retirement(id)
    }

    /// Current state of a live task.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.scheduler.get(id).map(|t| t.state().clone())
    }

    pub fn retirement(&self, id: TaskId) -> Option<RetiredTask> {
        self.reports
            .iter()
            .flat_map(|r| r.retired.iter())
            .find(|r| r.id == id)
            .cloned()
    }

    /// Every transition task `id` has made, in order.
    pub fn transitions(&self, id: TaskId) -> Vec<Transition> {
        self.reports
            .iter()
            .flat_map(|r| r.transitions.iter())
            .filter(|t| t.task == id)
            .cloned()
            .collect()
    }

    /// The states task `id` has passed through, starting at `Initializing`.
    pub fn path(&self, id: TaskId) -> Vec<TaskState> {
        let mut path = vec![TaskState::Initializing];
        path.extend(self.transitions(id).into_iter().map(|t| t.to));
        path
    }
}
