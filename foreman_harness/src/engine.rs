// Deterministic fake engine.
//
// Implements every collaborator contract of `foreman_core` on a small world
// model and advances it one frame at a time:
//
// - Move orders walk a unit toward its target at `speed` pixels per frame;
//   arriving turns the order back to `Idle`.
// - A build order makes the worker walk into reach of the site and then
//   start the structure: the price is deducted from the bank, the footprint
//   is occupied, and a `UnitCreated` notification is scheduled
//   `creation_delay` frames later. If the site no longer fits or the bank
//   cannot pay, the order silently lapses back to `Idle`.
// - A train order starts the unit inside its producer the same way.
// - Construction timers count down while the builder is alive. A finished
//   entity notifies `UnitCompleted`, frees its builder, and joins the roster.
// - Destroyed units notify `UnitDestroyed`.
// - Abandoned constructions (a halted builder, a cancelled entity) are torn
//   down at the start of the next frame and their price is refunded. If the
//   `UnitCreated` notification is still pending it is retracted; otherwise
//   the entity notifies `UnitDestroyed`.
//
// The collaborators live in separate fields so `services()` can lend them
// out as one disjoint `Services` borrow.

use crate::queue::NotificationQueue;
use crate::roster::Roster;
use crate::stockpile::Stockpile;
use crate::terrain::Terrain;
use crate::units::{Construction, SimUnit, UnitTable};
use foreman_core::config::AgentConfig;
use foreman_core::event::{EntityRef, WorldEvent};
use foreman_core::services::{Order, Services};
use foreman_core::types::{Cost, Position, TILE_SIZE, TilePosition, UnitId, UnitKind};
use tracing::debug;

/// A worker starts a structure once it is this close to the site, in pixels.
const BUILD_REACH: u32 = 48;

pub struct FakeEngine {
    pub config: AgentConfig,
    pub frame: u64,
    pub stockpile: Stockpile,
    pub roster: Roster,
    pub terrain: Terrain,
    pub units: UnitTable,
    pub queue: NotificationQueue,
    /// Pixels per frame.
    pub speed: u32,
    /// Frames between an entity starting and its `UnitCreated` notification.
    pub creation_delay: u64,
    next_unit: u32,
}

impl FakeEngine {
    pub fn new(config: AgentConfig, bank: Cost) -> Self {
        let footprints = config
            .unit_kinds
            .iter()
            .map(|(kind, profile)| (*kind, profile.footprint))
            .collect();
        Self {
            config,
            frame: 0,
            stockpile: Stockpile::new(bank),
            roster: Roster::default(),
            terrain: Terrain::new(128, 128, footprints),
            units: UnitTable::default(),
            queue: NotificationQueue::new(),
            speed: 6,
            creation_delay: 2,
            next_unit: 0,
        }
    }

    /// Borrow every collaborator for one scheduler tick.
    pub fn services(&mut self) -> Services<'_> {
        Services {
            config: &self.config,
            ledger: &mut self.stockpile,
            workers: &mut self.roster,
            placement: &self.terrain,
            units: &mut self.units,
        }
    }

    /// Place a finished unit in the world without a notification, as if it
    /// existed before the agent started.
    pub fn spawn(&mut self, kind: UnitKind, position: Position) -> UnitId {
        let id = self.allocate_id();
        self.units.units.insert(id, SimUnit::finished(kind, position));
        let stationary = self
            .config
            .unit_kinds
            .get(&kind)
            .is_some_and(|profile| profile.stationary);
        if stationary {
            let tile = TilePosition::new(position.x / TILE_SIZE, position.y / TILE_SIZE);
            self.terrain.occupy(kind, tile, id);
        }
        self.roster.enlist(id, kind, position);
        id
    }

    /// Remove a unit and schedule its `UnitDestroyed` notification.
    pub fn destroy(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.units.units.remove(&id) else {
            return false;
        };
        self.roster.discharge(id);
        self.terrain.vacate(id);
        self.release_builders(id);
        debug!(unit = %id, kind = ?unit.kind, frame = self.frame, "unit destroyed");
        self.announce(WorldEvent::UnitDestroyed(EntityRef {
            id,
            kind: unit.kind,
            owned: true,
        }));
        true
    }

    /// Schedule a raw notification for the next frame.
    pub fn announce(&mut self, event: WorldEvent) {
        self.queue.schedule(self.frame, event);
    }

    /// Simulate one frame. Returns the notifications due this frame, in
    /// delivery order.
    pub fn advance(&mut self) -> Vec<WorldEvent> {
        self.frame += 1;
        self.tear_down_abandoned();
        for id in self.units.ids() {
            self.carry_out_order(id);
        }
        self.progress_constructions();
        for (id, unit) in &self.units.units {
            self.roster.update_position(*id, unit.position);
        }
        self.queue.drain_due(self.frame)
    }

    fn allocate_id(&mut self) -> UnitId {
        self.next_unit += 1;
        UnitId(self.next_unit)
    }

    fn carry_out_order(&mut self, id: UnitId) {
        let Some(unit) = self.units.get(id) else {
            return;
        };
        let (order, position, busy) = (unit.order, unit.position, unit.working_on.is_some());
        match order {
            Order::Move(to) => {
                let next = step_toward(position, to, self.speed);
                if let Some(unit) = self.units.get_mut(id) {
                    unit.position = next;
                    if next == to {
                        unit.order = Order::Idle;
                    }
                }
            }
            Order::Build { kind, at } if !busy => {
                let site = Position::from(at);
                if position.distance(site) > BUILD_REACH {
                    if let Some(unit) = self.units.get_mut(id) {
                        unit.position = step_toward(position, site, self.speed);
                    }
                } else {
                    self.start(id, kind, Some(at));
                }
            }
            Order::Train(kind) if !busy => self.start(id, kind, None),
            _ => {}
        }
    }

    /// Begin `kind` for `builder`, at `site` for structures.
    fn start(&mut self, builder: UnitId, kind: UnitKind, site: Option<TilePosition>) {
        let Some(profile) = self.config.unit_kinds.get(&kind) else {
            self.lapse(builder);
            return;
        };
        let (price, build_time) = (profile.cost, profile.build_time);
        let fits = site.is_none_or(|at| self.terrain.fits(kind, at));
        if !fits || !self.stockpile.spend(price) {
            debug!(unit = %builder, ?kind, frame = self.frame, "order lapsed");
            self.lapse(builder);
            return;
        }
        let Some(builder_at) = self.units.get(builder).map(|u| u.position) else {
            return;
        };

        let id = self.allocate_id();
        let position = site.map_or(builder_at, Position::from);
        if let Some(at) = site {
            self.terrain.occupy(kind, at, id);
        }
        self.units.units.insert(
            id,
            SimUnit {
                construction: Some(Construction {
                    remaining: build_time,
                    total: build_time,
                    builder,
                }),
                ..SimUnit::finished(kind, position)
            },
        );
        if let Some(unit) = self.units.get_mut(builder) {
            unit.working_on = Some(id);
        }
        debug!(unit = %id, ?kind, %builder, frame = self.frame, "construction started");
        self.queue.schedule(
            self.frame + self.creation_delay,
            WorldEvent::UnitCreated(EntityRef {
                id,
                kind,
                owned: true,
            }),
        );
    }

    fn tear_down_abandoned(&mut self) {
        for id in self.units.take_abandoned() {
            let unfinished = self
                .units
                .get(id)
                .is_some_and(|unit| unit.construction.is_some());
            if !unfinished {
                continue;
            }
            let Some(unit) = self.units.units.remove(&id) else {
                continue;
            };
            if let Some(profile) = self.config.unit_kinds.get(&unit.kind) {
                self.stockpile.deposit(profile.cost);
            }
            self.terrain.vacate(id);
            self.release_builders(id);
            debug!(unit = %id, kind = ?unit.kind, frame = self.frame, "construction abandoned");
            if self.queue.retract(id) == 0 {
                self.announce(WorldEvent::UnitDestroyed(EntityRef {
                    id,
                    kind: unit.kind,
                    owned: true,
                }));
            }
        }
    }

    /// Free every unit that was building `entity`.
    fn release_builders(&mut self, entity: UnitId) {
        for unit in self.units.units.values_mut() {
            if unit.working_on == Some(entity) {
                unit.working_on = None;
                unit.order = Order::Idle;
            }
        }
    }

    fn lapse(&mut self, unit: UnitId) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.order = Order::Idle;
        }
    }

    fn progress_constructions(&mut self) {
        let mut finished = Vec::new();
        let alive: Vec<UnitId> = self.units.ids();
        for (id, unit) in self.units.units.iter_mut() {
            let Some(construction) = unit.construction.as_mut() else {
                continue;
            };
            if alive.binary_search(&construction.builder).is_err() {
                continue;
            }
            construction.remaining = construction.remaining.saturating_sub(1);
            if construction.remaining == 0 {
                unit.construction = None;
                finished.push((*id, unit.kind, unit.position));
            }
        }
        for (id, kind, position) in finished {
            self.release_builders(id);
            self.roster.enlist(id, kind, position);
            debug!(unit = %id, ?kind, frame = self.frame, "construction finished");
            self.queue.schedule(
                self.frame,
                WorldEvent::UnitCompleted(EntityRef {
                    id,
                    kind,
                    owned: true,
                }),
            );
        }
    }
}

/// Move `from` up to `speed` pixels toward `to`.
fn step_toward(from: Position, to: Position, speed: u32) -> Position {
    let distance = from.distance(to);
    if distance <= speed {
        return to;
    }
    let dx = i64::from(to.x - from.x) * i64::from(speed) / i64::from(distance);
    let dy = i64::from(to.y - from.y) * i64::from(speed) / i64::from(distance);
    Position::new(from.x + dx as i32, from.y + dy as i32)
}
