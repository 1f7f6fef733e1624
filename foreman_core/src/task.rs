// Construction tasks: one pending construction order as a state machine.
//
// A task is created by the strategic layer (through the scheduler) with a
// target kind, a priority, a desired location and an exact-location flag,
// and is then advanced by exactly one `update()` call per frame. Each call
// performs at most one state transition. Staying in the same state across
// frames is how a task "waits": there is no other suspension mechanism, and
// no execution context beyond the fields of `ConstructionTask`.
//
// ## States
//
//   Initializing → AcquiringResources → AcquiringWorker ─┬→ MovingToSite → IssuingBuild
//                                                        └───────────────→ IssuingBuild
//   IssuingBuild → AwaitingEntity → UnderConstruction → Finalizing → Complete
//
// with one retry edge `IssuingBuild → MovingToSite` (placement rejected or
// build order refused), and the terminal side exits `Failed(reason)` and
// `Cancelled`. Structures (`profile.stationary`) walk their worker to the
// site; trained units skip `MovingToSite` and issue a train order to their
// producer.
//
// ## Resources
//
// The currency hold is taken in `AcquiringResources` as a move-only
// `Reservation` and settled on the single edge `AwaitingEntity →
// UnderConstruction`, i.e. once the engine confirms the entity exists and
// has deducted the price itself. Every exit to `Failed` or `Cancelled` goes
// through `relinquish()`, which settles a still-held reservation and hands
// a live worker back to the pool. Nothing is left to `Drop`.
//
// ## Notifications
//
// `on_entity_created` / `on_entity_destroyed` / `on_entity_completed` are
// called by the event router between frames. They only record facts on the
// task; the next `update()` acts on them, so transitions and collaborator
// calls happen in one place.
//
// ## Retry bound
//
// Consecutive placement rejections, refused build/train orders, frames where
// the oracle has no fresh site, and lapsed build orders all count toward
// `config.max_placement_retries`. Exceeding it fails the task with
// `RetriesExhausted`; a confirmed build order resets the count. An
// exact-location task keeps retrying its one site under the same bound.
//
// See also: `scheduler.rs` for the per-frame driver, `event.rs` for
// correlation, `services.rs` and `ledger.rs` for the collaborator contracts.

use crate::config::AgentConfig;
use crate::event::EntityRef;
use crate::ledger::{self, Reservation};
use crate::profile::UnitProfile;
use crate::services::{Order, Services};
use crate::types::{Position, Priority, TaskId, TilePosition, UnitId, UnitKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Lifecycle state of a construction task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Just created.
    Initializing,
    /// Waiting for the ledger to grant the price.
    AcquiringResources,
    /// Waiting for an idle unit able to build or train the target.
    AcquiringWorker,
    /// Structures only: the worker walks to the resolved site.
    MovingToSite,
    /// Revalidate the site and send the build (or train) order.
    IssuingBuild,
    /// Order accepted; waiting for the engine to report the new entity.
    AwaitingEntity,
    /// Entity exists and is progressing.
    UnderConstruction,
    /// Completion signalled; return the worker.
    Finalizing,
    /// Retired successfully.
    Complete,
    /// Retired after a lost dependency or contract violation.
    Failed(FailureReason),
    /// Retired by an external cancel.
    Cancelled,
}

impl TaskState {
    /// Terminal states are removed by the scheduler after the frame.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Complete | TaskState::Failed(_) | TaskState::Cancelled
        )
    }
}

/// Why a task failed.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    #[error("worker lost")]
    WorkerLost,
    #[error("entity destroyed")]
    EntityDestroyed,
    #[error("retries exhausted")]
    RetriesExhausted,
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

fn violation(what: &str) -> FailureReason {
    FailureReason::ContractViolation(what.to_string())
}

/// One state change, as reported to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub task: TaskId,
    pub frame: u64,
    pub from: TaskState,
    pub to: TaskState,
}

/// Percent complete from the engine's remaining/total frame counts, using
/// integer division like the engine's own timers. Clamped to `0..=100`.
pub fn progress_percent(remaining: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let remaining = u64::from(remaining.min(total));
    (100 - 100 * remaining / u64::from(total)) as u8
}

/// A pending construction order.
#[derive(Debug, Serialize)]
pub struct ConstructionTask {
    id: TaskId,
    target: UnitKind,
    profile: UnitProfile,
    priority: Priority,
    desired_location: TilePosition,
    exact_location: bool,
    state: TaskState,
    /// Frame of the last transition.
    entered_frame: u64,
    worker: Option<UnitId>,
    /// Resolved build tile; `None` means not (or no longer) resolved.
    placement: Option<TilePosition>,
    last_rejected: Option<TilePosition>,
    retries: u32,
    observed: Option<UnitId>,
    reservation: Option<Reservation>,
    progress: u8,
    worker_lost: bool,
    entity_lost: bool,
    entity_completed: bool,
}

impl ConstructionTask {
    pub fn new(
        id: TaskId,
        target: UnitKind,
        profile: UnitProfile,
        priority: Priority,
        desired_location: TilePosition,
        exact_location: bool,
    ) -> Self {
        Self {
            id,
            target,
            profile,
            priority,
            desired_location,
            exact_location,
            state: TaskState::Initializing,
            entered_frame: 0,
            worker: None,
            placement: None,
            last_rejected: None,
            retries: 0,
            observed: None,
            reservation: None,
            progress: 0,
            worker_lost: false,
            entity_lost: false,
            entity_completed: false,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn target(&self) -> UnitKind {
        self.target
    }

    pub fn profile(&self) -> &UnitProfile {
        &self.profile
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn desired_location(&self) -> TilePosition {
        self.desired_location
    }

    pub fn exact_location(&self) -> bool {
        self.exact_location
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn worker(&self) -> Option<UnitId> {
        self.worker
    }

    pub fn placement(&self) -> Option<TilePosition> {
        self.placement
    }

    pub fn observed(&self) -> Option<UnitId> {
        self.observed
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Consecutive retries counted toward `max_placement_retries`.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Percent complete, once the entity exists. Never decreases.
    pub fn progress(&self) -> Option<u8> {
        match self.state {
            TaskState::UnderConstruction | TaskState::Finalizing | TaskState::Complete => {
                Some(self.progress)
            }
            _ => None,
        }
    }

    /// Correlation key: the frame this task started waiting for its entity,
    /// or `None` if it is not waiting.
    pub fn awaiting_since(&self) -> Option<u64> {
        (self.state == TaskState::AwaitingEntity && self.observed.is_none())
            .then_some(self.entered_frame)
    }

    /// Human-readable status. Always available, whatever the state.
    pub fn describe(&self) -> String {
        let name = &self.profile.name;
        match &self.state {
            TaskState::Initializing => format!("{name}: Initialization"),
            TaskState::AcquiringResources => format!("{name}: Acquiring resources..."),
            TaskState::AcquiringWorker => format!("{name}: Acquiring worker..."),
            TaskState::MovingToSite => format!("{name}: Moving to position..."),
            TaskState::IssuingBuild | TaskState::AwaitingEntity => {
                format!("{name}: Start building...")
            }
            TaskState::UnderConstruction => format!("{name} ({}%)", self.progress),
            TaskState::Finalizing => format!("{name}: Finalization"),
            TaskState::Complete => format!("{name}: Complete"),
            TaskState::Failed(reason) => format!("{name}: Failed ({reason})"),
            TaskState::Cancelled => format!("{name}: Cancelled"),
        }
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Offer a newly created entity. Returns true if this task claims it.
    /// Only a task in `AwaitingEntity` without an entity yet claims, and only
    /// an entity of its target kind.
    pub fn on_entity_created(&mut self, entity: &EntityRef) -> bool {
        if self.state != TaskState::AwaitingEntity
            || self.observed.is_some()
            || entity.kind != self.target
        {
            return false;
        }
        self.observed = Some(entity.id);
        true
    }

    /// Note the loss of the worker or the observed entity. Any other entity
    /// is ignored.
    pub fn on_entity_destroyed(&mut self, entity: &EntityRef) {
        if self.worker == Some(entity.id) {
            self.worker_lost = true;
        }
        if self.observed == Some(entity.id) {
            self.entity_lost = true;
        }
    }

    pub fn on_entity_completed(&mut self, entity: &EntityRef) {
        if self.observed == Some(entity.id) {
            self.entity_completed = true;
        }
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Advance at most one state. Returns the transition, if any.
    pub fn update(&mut self, frame: u64, services: &mut Services<'_>) -> Option<Transition> {
        if self.state.is_terminal() {
            return None;
        }
        let outcome = self
            .check_dependencies()
            .and_then(|()| self.advance(frame, services));
        let next = match outcome {
            Ok(Some(next)) => next,
            Ok(None) => return None,
            Err(reason) => self.fail(reason, services),
        };
        Some(self.enter(next, frame))
    }

    /// Give back everything held and retire as `Cancelled`.
    pub fn cancel(&mut self, frame: u64, services: &mut Services<'_>) -> Option<Transition> {
        if self.state.is_terminal() {
            return None;
        }
        self.withdraw_orders(services);
        self.relinquish(services);
        Some(self.enter(TaskState::Cancelled, frame))
    }

    fn enter(&mut self, next: TaskState, frame: u64) -> Transition {
        let from = std::mem::replace(&mut self.state, next.clone());
        self.entered_frame = frame;
        debug!(task = %self.id, target = ?self.target, ?from, to = ?next, frame, "task transition");
        Transition {
            task: self.id,
            frame,
            from,
            to: next,
        }
    }

    /// Lost dependencies reported since the last update. Completion wins
    /// over a worker lost in the same frame.
    fn check_dependencies(&self) -> Result<(), FailureReason> {
        match self.state {
            TaskState::AwaitingEntity | TaskState::UnderConstruction if self.entity_lost => {
                Err(FailureReason::EntityDestroyed)
            }
            TaskState::UnderConstruction if self.entity_completed => Ok(()),
            TaskState::MovingToSite
            | TaskState::IssuingBuild
            | TaskState::AwaitingEntity
            | TaskState::UnderConstruction
                if self.worker_lost =>
            {
                Err(FailureReason::WorkerLost)
            }
            _ => Ok(()),
        }
    }

    fn advance(
        &mut self,
        frame: u64,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        match self.state {
            // Nothing to validate up front yet.
            TaskState::Initializing => Ok(Some(TaskState::AcquiringResources)),
            TaskState::AcquiringResources => self.acquire_resources(services),
            TaskState::AcquiringWorker => self.acquire_worker(services),
            TaskState::MovingToSite => self.move_to_site(services),
            TaskState::IssuingBuild => self.issue_build(services),
            TaskState::AwaitingEntity => self.await_entity(frame, services),
            TaskState::UnderConstruction => self.track_construction(services),
            TaskState::Finalizing => {
                self.relinquish(services);
                Ok(Some(TaskState::Complete))
            }
            // Filtered out by update().
            TaskState::Complete | TaskState::Failed(_) | TaskState::Cancelled => Ok(None),
        }
    }

    fn acquire_resources(
        &mut self,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        if self.reservation.is_some() {
            return Err(violation("reservation already held"));
        }
        match ledger::reserve(services.ledger, self.profile.cost) {
            Some(reservation) => {
                self.reservation = Some(reservation);
                Ok(Some(TaskState::AcquiringWorker))
            }
            None => Ok(None),
        }
    }

    fn acquire_worker(
        &mut self,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        if self.worker.is_some() {
            return Err(violation("acquiring a second worker"));
        }
        let near = Position::from(self.desired_location);
        let Some(worker) = services.workers.acquire(self.profile.builder, near) else {
            return Ok(None);
        };
        self.worker = Some(worker);
        self.worker_lost = false;
        if self.profile.stationary {
            Ok(Some(TaskState::MovingToSite))
        } else {
            Ok(Some(TaskState::IssuingBuild))
        }
    }

    fn move_to_site(
        &mut self,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        let worker = self.held_worker()?;
        let site = match self.placement {
            Some(site) => site,
            None => match self.pick_site(services)? {
                Some(site) => site,
                None => return Ok(None),
            },
        };
        let target = Position::from(site);
        let arrived = services
            .units
            .position(worker)
            .is_some_and(|at| at.distance(target) < services.config.arrival_radius);
        if arrived {
            return Ok(Some(TaskState::IssuingBuild));
        }
        if services.units.current_order(worker) != Some(Order::Move(target)) {
            services.units.issue_move(worker, target);
        }
        Ok(None)
    }

    /// Resolve a placement, skipping the tile rejected last time.
    fn pick_site(
        &mut self,
        services: &Services<'_>,
    ) -> Result<Option<TilePosition>, FailureReason> {
        let candidate = if self.exact_location {
            Some(self.desired_location)
        } else {
            services
                .placement
                .resolve(self.target, self.desired_location)
        };
        match candidate {
            Some(site) if self.last_rejected != Some(site) => {
                self.placement = Some(site);
                Ok(Some(site))
            }
            _ => {
                self.count_retry(services.config)?;
                Ok(None)
            }
        }
    }

    fn issue_build(
        &mut self,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        let worker = self.held_worker()?;
        if !self.profile.stationary {
            let accepted = services.units.current_order(worker) == Some(Order::Train(self.target))
                || services.units.issue_train(worker, self.target);
            if accepted {
                self.retries = 0;
                return Ok(Some(TaskState::AwaitingEntity));
            }
            self.count_retry(services.config)?;
            return Ok(None);
        }

        let site = self
            .placement
            .ok_or_else(|| violation("issuing a build without a placement"))?;
        let order = Order::Build {
            kind: self.target,
            at: site,
        };
        let accepted = services.placement.is_valid(self.target, site, worker)
            && (services.units.current_order(worker) == Some(order)
                || services.units.issue_build(worker, self.target, site));
        if accepted {
            self.retries = 0;
            self.last_rejected = None;
            return Ok(Some(TaskState::AwaitingEntity));
        }

        // An exact site has no alternative; it is tried again after a frame
        // back in MovingToSite.
        self.placement = None;
        if !self.exact_location {
            self.last_rejected = Some(site);
        }
        self.count_retry(services.config)?;
        debug!(
            task = %self.id,
            %site,
            exact = self.exact_location,
            retries = self.retries,
            "placement rejected"
        );
        Ok(Some(TaskState::MovingToSite))
    }

    fn await_entity(
        &mut self,
        frame: u64,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        if self.observed.is_some() {
            let reservation = self
                .reservation
                .take()
                .ok_or_else(|| violation("entity observed without a reservation"))?;
            ledger::settle(services.ledger, reservation)
                .map_err(|err| FailureReason::ContractViolation(err.to_string()))?;
            return Ok(Some(TaskState::UnderConstruction));
        }

        if frame.saturating_sub(self.entered_frame) < services.config.entity_timeout_frames {
            return Ok(None);
        }
        let worker = self.held_worker()?;
        let still_ordered = match services.units.current_order(worker) {
            Some(Order::Build { kind, .. }) | Some(Order::Train(kind)) => kind == self.target,
            _ => false,
        };
        if still_ordered {
            return Ok(None);
        }

        warn!(
            task = %self.id,
            target = ?self.target,
            frame,
            "build order lapsed without a new entity"
        );
        self.count_retry(services.config)?;
        if self.profile.stationary {
            self.placement = None;
            Ok(Some(TaskState::MovingToSite))
        } else {
            Ok(Some(TaskState::IssuingBuild))
        }
    }

    fn track_construction(
        &mut self,
        services: &mut Services<'_>,
    ) -> Result<Option<TaskState>, FailureReason> {
        let entity = self
            .observed
            .ok_or_else(|| violation("under construction without an entity"))?;
        if self.entity_completed {
            self.progress = 100;
            return Ok(Some(TaskState::Finalizing));
        }
        if let Some(remaining) = services.units.remaining_build_time(entity) {
            let now = progress_percent(remaining, self.profile.build_time);
            self.progress = self.progress.max(now);
        }
        // Awaiting the completion notification.
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn held_worker(&self) -> Result<UnitId, FailureReason> {
        self.worker
            .ok_or_else(|| violation("no worker held in a worker state"))
    }

    fn count_retry(&mut self, config: &AgentConfig) -> Result<(), FailureReason> {
        self.retries += 1;
        if self.retries > config.max_placement_retries {
            return Err(FailureReason::RetriesExhausted);
        }
        Ok(())
    }

    fn fail(&mut self, reason: FailureReason, services: &mut Services<'_>) -> TaskState {
        warn!(task = %self.id, target = ?self.target, state = ?self.state, %reason, "task failed");
        self.relinquish(services);
        TaskState::Failed(reason)
    }

    /// Withdraw whatever this task already handed to the engine.
    fn withdraw_orders(&mut self, services: &mut Services<'_>) {
        let ordered = matches!(
            self.state,
            TaskState::IssuingBuild | TaskState::AwaitingEntity | TaskState::UnderConstruction
        );
        if !ordered {
            return;
        }
        if let Some(entity) = self.observed.filter(|_| !self.entity_lost) {
            services.units.cancel_construction(entity);
        }
        if let Some(worker) = self.worker.filter(|_| !self.worker_lost) {
            services.units.halt(worker);
        }
        debug!(task = %self.id, target = ?self.target, state = ?self.state, "orders withdrawn");
    }

    /// Settle a still-held reservation and return a live worker.
    fn relinquish(&mut self, services: &mut Services<'_>) {
        let settled = self
            .reservation
            .take()
            .map(|reservation| ledger::settle(services.ledger, reservation));
        if let Some(Err(err)) = settled {
            error!(task = %self.id, %err, "ledger refused release");
        }
        let worker = self.worker.take().filter(|_| !self.worker_lost);
        if let Some(worker) = worker {
            services.workers.release(worker);
        }
    }
}
