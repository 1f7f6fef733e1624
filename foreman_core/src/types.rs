// Core types shared across the task engine.
//
// Defines spatial coordinates (`TilePosition` on the build grid, `Position`
// in pixels), identifiers for tasks and engine entities, currency amounts
// (`Cost`), the advisory `Priority`, and the `UnitKind` enum naming every
// constructible target. All types derive `Serialize` and `Deserialize` so
// configs, commands and reports can be exchanged as JSON.
//
// See also: `profile.rs` for the per-kind data (`UnitProfile`), `config.rs`
// for the table that maps `UnitKind` to its profile.
//
// **Critical constraint: determinism.** `TaskId`s are handed out by the
// scheduler in strictly increasing order, so `BTreeMap<TaskId, _>` iteration
// is insertion order. Do not reuse or randomize them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// Side length of one build tile, in pixels.
pub const TILE_SIZE: i32 = 32;

/// A cell of the build grid. Structures are placed on tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev (ring) distance between two tiles.
    pub fn ring_distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }
}

impl fmt::Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// A point on the map in pixel units. Units move in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in whole pixels (truncated).
    pub fn distance(self, other: Self) -> u32 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        ((dx * dx + dy * dy) as f64).sqrt() as u32
    }
}

/// The top-left pixel of a tile.
impl From<TilePosition> for Position {
    fn from(tile: TilePosition) -> Self {
        Self::new(tile.x * TILE_SIZE, tile.y * TILE_SIZE)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Handle for a construction task. Issued by the scheduler, monotonically
/// increasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Engine-assigned identifier of a unit or structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// An amount of both currencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cost {
    pub minerals: u32,
    pub gas: u32,
}

impl Cost {
    pub const ZERO: Cost = Cost::new(0, 0);

    pub const fn new(minerals: u32, gas: u32) -> Self {
        Self { minerals, gas }
    }

    /// True if `self` covers `other` in both currencies.
    pub fn covers(self, other: Self) -> bool {
        self.minerals >= other.minerals && self.gas >= other.gas
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self::new(
            self.minerals.saturating_sub(other.minerals),
            self.gas.saturating_sub(other.gas),
        )
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost::new(self.minerals + rhs.minerals, self.gas + rhs.gas)
    }
}

impl Sub for Cost {
    type Output = Cost;

    fn sub(self, rhs: Cost) -> Cost {
        Cost::new(self.minerals - rhs.minerals, self.gas - rhs.gas)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m/{}g", self.minerals, self.gas)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Priority of a construction order. Consumed by the layer that creates
/// tasks; the scheduler itself runs tasks in insertion order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Every kind of thing a task can construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Scv,
    Marine,
    Firebat,
    Medic,
    Vulture,
    SiegeTank,
    CommandCenter,
    SupplyDepot,
    Refinery,
    Barracks,
    EngineeringBay,
    Bunker,
    Academy,
    Factory,
}

impl UnitKind {
    pub const ALL: [UnitKind; 14] = [
        UnitKind::Scv,
        UnitKind::Marine,
        UnitKind::Firebat,
        UnitKind::Medic,
        UnitKind::Vulture,
        UnitKind::SiegeTank,
        UnitKind::CommandCenter,
        UnitKind::SupplyDepot,
        UnitKind::Refinery,
        UnitKind::Barracks,
        UnitKind::EngineeringBay,
        UnitKind::Bunker,
        UnitKind::Academy,
        UnitKind::Factory,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_to_position_is_top_left_pixel() {
        let p = Position::from(TilePosition::new(3, 5));
        assert_eq!(p, Position::new(96, 160));
    }

    #[test]
    fn position_distance_truncates() {
        let a = Position::new(0, 0);
        assert_eq!(a.distance(Position::new(3, 4)), 5);
        assert_eq!(a.distance(Position::new(1, 1)), 1);
        assert_eq!(Position::new(10, 10).distance(a), 14);
    }

    #[test]
    fn ring_distance_is_chebyshev() {
        let a = TilePosition::new(0, 0);
        assert_eq!(a.ring_distance(TilePosition::new(2, -5)), 5);
        assert_eq!(a.ring_distance(a), 0);
    }

    #[test]
    fn cost_covers_both_currencies() {
        let bank = Cost::new(100, 50);
        assert!(bank.covers(Cost::new(100, 50)));
        assert!(!bank.covers(Cost::new(101, 0)));
        assert!(!bank.covers(Cost::new(0, 51)));
        assert_eq!(bank.saturating_sub(Cost::new(150, 10)), Cost::new(0, 40));
    }

    #[test]
    fn task_ids_order_by_issue() {
        assert!(TaskId(1) < TaskId(2));
        assert_eq!(TaskId(7).to_string(), "task#7");
    }
}
