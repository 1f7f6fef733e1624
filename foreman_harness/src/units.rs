// Unit table and command channel of the fake engine.
//
// Holds every entity the agent owns with its position, current order and,
// for entities still being built, a construction timer. Accepting an order
// only records it; `FakeEngine::advance` carries orders out frame by frame.
// Halting a builder or cancelling a construction marks the unfinished entity
// as abandoned, and the engine removes and refunds it on its next frame.

use foreman_core::services::{Order, UnitControl};
use foreman_core::types::{Position, TilePosition, UnitId, UnitKind};
use std::collections::{BTreeMap, BTreeSet};

/// Build timer of an entity that is not finished yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Construction {
    pub remaining: u32,
    pub total: u32,
    /// Worker or producer building it. Progress halts while it is gone.
    pub builder: UnitId,
}

#[derive(Clone, Debug)]
pub struct SimUnit {
    pub kind: UnitKind,
    pub position: Position,
    pub order: Order,
    /// Entity this unit is currently building or training.
    pub working_on: Option<UnitId>,
    pub construction: Option<Construction>,
}

impl SimUnit {
    pub fn finished(kind: UnitKind, position: Position) -> Self {
        Self {
            kind,
            position,
            order: Order::Idle,
            working_on: None,
            construction: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UnitTable {
    pub(crate) units: BTreeMap<UnitId, SimUnit>,
    /// Unfinished entities to tear down on the next frame.
    pub(crate) abandoned: BTreeSet<UnitId>,
    /// When set, every build and train order is refused.
    pub refuse_orders: bool,
    pub moves: u32,
    pub builds: u32,
    pub trains: u32,
    pub halts: u32,
}

impl UnitTable {
    pub fn get(&self, id: UnitId) -> Option<&SimUnit> {
        self.units.get(&id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut SimUnit> {
        self.units.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Finished units of `kind`.
    pub fn count(&self, kind: UnitKind) -> usize {
        self.units
            .values()
            .filter(|u| u.kind == kind && u.construction.is_none())
            .count()
    }

    /// Take the entities abandoned since the last call.
    pub(crate) fn take_abandoned(&mut self) -> BTreeSet<UnitId> {
        std::mem::take(&mut self.abandoned)
    }

    fn accepts(&self, unit: UnitId) -> bool {
        !self.refuse_orders
            && self
                .units
                .get(&unit)
                .is_some_and(|u| u.construction.is_none() && u.working_on.is_none())
    }
}

impl UnitControl for UnitTable {
    fn position(&self, unit: UnitId) -> Option<Position> {
        self.units.get(&unit).map(|u| u.position)
    }

    fn current_order(&self, unit: UnitId) -> Option<Order> {
        self.units.get(&unit).map(|u| u.order)
    }

    fn issue_move(&mut self, unit: UnitId, to: Position) -> bool {
        self.moves += 1;
        match self.units.get_mut(&unit) {
            Some(u) => {
                u.order = Order::Move(to);
                true
            }
            None => false,
        }
    }

    fn issue_build(&mut self, unit: UnitId, kind: UnitKind, at: TilePosition) -> bool {
        self.builds += 1;
        if !self.accepts(unit) {
            return false;
        }
        self.units
            .get_mut(&unit)
            .map(|u| u.order = Order::Build { kind, at })
            .is_some()
    }

    fn issue_train(&mut self, producer: UnitId, kind: UnitKind) -> bool {
        self.trains += 1;
        if !self.accepts(producer) {
            return false;
        }
        self.units
            .get_mut(&producer)
            .map(|u| u.order = Order::Train(kind))
            .is_some()
    }

    fn halt(&mut self, unit: UnitId) -> bool {
        self.halts += 1;
        let Some(u) = self.units.get_mut(&unit) else {
            return false;
        };
        u.order = Order::Idle;
        if let Some(entity) = u.working_on.take() {
            self.abandoned.insert(entity);
        }
        true
    }

    fn cancel_construction(&mut self, entity: UnitId) -> bool {
        let unfinished = self
            .units
            .get(&entity)
            .is_some_and(|u| u.construction.is_some());
        if unfinished {
            self.abandoned.insert(entity);
        }
        unfinished
    }

    fn remaining_build_time(&self, entity: UnitId) -> Option<u32> {
        let unit = self.units.get(&entity)?;
        Some(unit.construction.map_or(0, |c| c.remaining))
    }
}
