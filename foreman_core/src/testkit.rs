// Scripted collaborators for unit tests.
//
// Each fake implements one collaborator contract with knobs the tests turn
// directly (available money, idle units, which placements get rejected,
// whether orders are accepted) and counters the tests assert on. `Rig`
// bundles them with a config and a frame counter and can hand out a
// `Services` borrow.
//
// Compiled only under `cfg(test)`; the end-to-end fake engine with movement
// and construction lives in the `foreman_harness` crate.

use crate::config::AgentConfig;
use crate::error::LedgerError;
use crate::ledger::ResourceLedger;
use crate::services::{Order, PlacementOracle, Services, UnitControl, WorkerPool};
use crate::task::{ConstructionTask, TaskState, Transition};
use crate::types::{Cost, Position, Priority, TaskId, TilePosition, UnitId, UnitKind};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

pub const SCV: UnitId = UnitId(1);
pub const BARRACKS: UnitId = UnitId(2);
pub const SITE: TilePosition = TilePosition::new(10, 10);

#[derive(Default)]
pub struct ScriptedLedger {
    pub available: Cost,
    pub held: Cost,
    pub reserves: u32,
    pub releases: u32,
}

impl ResourceLedger for ScriptedLedger {
    fn reserve(&mut self, cost: Cost) -> bool {
        if !self.available.saturating_sub(self.held).covers(cost) {
            return false;
        }
        self.held = self.held + cost;
        self.reserves += 1;
        true
    }

    fn release(&mut self, cost: Cost) -> Result<(), LedgerError> {
        if !self.held.covers(cost) {
            return Err(LedgerError::UnmatchedRelease {
                cost,
                reserved: self.held,
            });
        }
        self.held = self.held - cost;
        self.releases += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedPool {
    pub idle: Vec<(UnitId, UnitKind)>,
    pub busy: Vec<(UnitId, UnitKind)>,
    pub returned: Vec<UnitId>,
}

impl WorkerPool for ScriptedPool {
    fn acquire(&mut self, capability: UnitKind, _near: Position) -> Option<UnitId> {
        let index = self.idle.iter().position(|(_, kind)| *kind == capability)?;
        let entry = self.idle.remove(index);
        self.busy.push(entry);
        Some(entry.0)
    }

    fn release(&mut self, worker: UnitId) {
        self.returned.push(worker);
        if let Some(index) = self.busy.iter().position(|(id, _)| *id == worker) {
            let entry = self.busy.remove(index);
            self.idle.push(entry);
        }
    }
}

/// Resolves to queued sites first, then `fallback`. Rejects the next
/// `rejections` validations.
#[derive(Default)]
pub struct ScriptedPlacement {
    pub queued: RefCell<VecDeque<TilePosition>>,
    pub fallback: Option<TilePosition>,
    pub rejections: Cell<u32>,
    pub resolves: Cell<u32>,
    pub validations: Cell<u32>,
}

impl PlacementOracle for ScriptedPlacement {
    fn resolve(&self, _kind: UnitKind, _near: TilePosition) -> Option<TilePosition> {
        self.resolves.set(self.resolves.get() + 1);
        self.queued.borrow_mut().pop_front().or(self.fallback)
    }

    fn is_valid(&self, _kind: UnitKind, _at: TilePosition, _worker: UnitId) -> bool {
        self.validations.set(self.validations.get() + 1);
        let pending = self.rejections.get();
        if pending > 0 {
            self.rejections.set(pending - 1);
            return false;
        }
        true
    }
}

/// Units teleport to their move target when `teleport` is set.
pub struct ScriptedUnits {
    pub positions: BTreeMap<UnitId, Position>,
    pub orders: BTreeMap<UnitId, Order>,
    pub remaining: BTreeMap<UnitId, u32>,
    pub accept_orders: bool,
    pub teleport: bool,
    pub moves: u32,
    pub builds: u32,
    pub trains: u32,
    pub halted: Vec<UnitId>,
    pub abandoned: Vec<UnitId>,
}

impl Default for ScriptedUnits {
    fn default() -> Self {
        Self {
            positions: BTreeMap::new(),
            orders: BTreeMap::new(),
            remaining: BTreeMap::new(),
            accept_orders: true,
            teleport: true,
            moves: 0,
            builds: 0,
            trains: 0,
            halted: Vec::new(),
            abandoned: Vec::new(),
        }
    }
}

impl UnitControl for ScriptedUnits {
    fn position(&self, unit: UnitId) -> Option<Position> {
        self.positions.get(&unit).copied()
    }

    fn current_order(&self, unit: UnitId) -> Option<Order> {
        self.positions
            .contains_key(&unit)
            .then(|| self.orders.get(&unit).copied().unwrap_or(Order::Idle))
    }

    fn issue_move(&mut self, unit: UnitId, to: Position) -> bool {
        self.moves += 1;
        self.orders.insert(unit, Order::Move(to));
        if self.teleport {
            self.positions.insert(unit, to);
        }
        true
    }

    fn issue_build(&mut self, unit: UnitId, kind: UnitKind, at: TilePosition) -> bool {
        self.builds += 1;
        if self.accept_orders {
            self.orders.insert(unit, Order::Build { kind, at });
        }
        self.accept_orders
    }

    fn issue_train(&mut self, producer: UnitId, kind: UnitKind) -> bool {
        self.trains += 1;
        if self.accept_orders {
            self.orders.insert(producer, Order::Train(kind));
        }
        self.accept_orders
    }

    fn halt(&mut self, unit: UnitId) -> bool {
        self.halted.push(unit);
        self.orders.insert(unit, Order::Idle);
        self.positions.contains_key(&unit)
    }

    fn cancel_construction(&mut self, entity: UnitId) -> bool {
        self.abandoned.push(entity);
        self.remaining.remove(&entity).is_some_and(|left| left > 0)
    }

    fn remaining_build_time(&self, entity: UnitId) -> Option<u32> {
        self.remaining.get(&entity).copied()
    }
}

/// A scripted world with one SCV, one Barracks, plenty of money and a
/// placement oracle that always suggests `SITE`.
pub struct Rig {
    pub config: AgentConfig,
    pub ledger: ScriptedLedger,
    pub pool: ScriptedPool,
    pub placement: ScriptedPlacement,
    pub units: ScriptedUnits,
    pub frame: u64,
}

impl Default for Rig {
    fn default() -> Self {
        let mut units = ScriptedUnits::default();
        units.positions.insert(SCV, Position::new(0, 0));
        units.positions.insert(BARRACKS, Position::new(640, 640));
        Self {
            config: AgentConfig::default(),
            ledger: ScriptedLedger {
                available: Cost::new(1000, 500),
                ..ScriptedLedger::default()
            },
            pool: ScriptedPool {
                idle: vec![(SCV, UnitKind::Scv), (BARRACKS, UnitKind::Barracks)],
                ..ScriptedPool::default()
            },
            placement: ScriptedPlacement {
                fallback: Some(SITE),
                ..ScriptedPlacement::default()
            },
            units,
            frame: 0,
        }
    }
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&mut self) -> Services<'_> {
        Services {
            config: &self.config,
            ledger: &mut self.ledger,
            workers: &mut self.pool,
            placement: &self.placement,
            units: &mut self.units,
        }
    }

    /// A task targeting `kind` near `SITE`.
    pub fn task(&self, id: u64, kind: UnitKind, exact: bool) -> ConstructionTask {
        let profile = self.config.unit_kinds[&kind].clone();
        ConstructionTask::new(TaskId(id), kind, profile, Priority::Normal, SITE, exact)
    }

    /// Advance one frame and update `task` once.
    pub fn step(&mut self, task: &mut ConstructionTask) -> Option<Transition> {
        self.frame += 1;
        let frame = self.frame;
        let mut services = self.services();
        task.update(frame, &mut services)
    }

    /// Step until `task` is in `state`. Returns false if `max_frames` pass
    /// first.
    pub fn run_until(
        &mut self,
        task: &mut ConstructionTask,
        state: TaskState,
        max_frames: u32,
    ) -> bool {
        for _ in 0..max_frames {
            if *task.state() == state {
                return true;
            }
            self.step(task);
        }
        *task.state() == state
    }
}
