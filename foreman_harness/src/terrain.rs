// Build grid and placement oracle of the fake engine.
//
// A rectangular tile map. A structure fits at a tile when its whole
// footprint (anchored at the tile's top-left) is in bounds, not blocked
// terrain, and not occupied by another structure. `resolve` searches rings
// of growing Chebyshev radius around the requested tile and returns the
// first fit, scanning each ring row by row so the answer is deterministic.

use foreman_core::services::PlacementOracle;
use foreman_core::types::{TilePosition, UnitId, UnitKind};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
pub struct Terrain {
    width: i32,
    height: i32,
    search_radius: u32,
    footprints: BTreeMap<UnitKind, (u32, u32)>,
    blocked: BTreeSet<TilePosition>,
    occupied: BTreeMap<TilePosition, UnitId>,
    pub resolves: Cell<u32>,
    pub validations: Cell<u32>,
}

impl Terrain {
    pub fn new(width: i32, height: i32, footprints: BTreeMap<UnitKind, (u32, u32)>) -> Self {
        Self {
            width,
            height,
            search_radius: 12,
            footprints,
            blocked: BTreeSet::new(),
            occupied: BTreeMap::new(),
            resolves: Cell::new(0),
            validations: Cell::new(0),
        }
    }

    /// Mark a tile unbuildable.
    pub fn block(&mut self, tile: TilePosition) {
        self.blocked.insert(tile);
    }

    pub fn unblock(&mut self, tile: TilePosition) {
        self.blocked.remove(&tile);
    }

    /// Tiles covered by `kind` anchored at `at`.
    pub fn footprint(&self, kind: UnitKind, at: TilePosition) -> Vec<TilePosition> {
        let (w, h) = self.footprints.get(&kind).copied().unwrap_or((1, 1));
        let mut tiles = Vec::with_capacity((w * h) as usize);
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                tiles.push(TilePosition::new(at.x + dx, at.y + dy));
            }
        }
        tiles
    }

    pub fn fits(&self, kind: UnitKind, at: TilePosition) -> bool {
        self.footprint(kind, at).iter().all(|tile| {
            (0..self.width).contains(&tile.x)
                && (0..self.height).contains(&tile.y)
                && !self.blocked.contains(tile)
                && !self.occupied.contains_key(tile)
        })
    }

    pub fn occupy(&mut self, kind: UnitKind, at: TilePosition, structure: UnitId) {
        for tile in self.footprint(kind, at) {
            self.occupied.insert(tile, structure);
        }
    }

    /// Free every tile held by `structure`.
    pub fn vacate(&mut self, structure: UnitId) {
        self.occupied.retain(|_, holder| *holder != structure);
    }

    pub fn occupant(&self, tile: TilePosition) -> Option<UnitId> {
        self.occupied.get(&tile).copied()
    }
}

impl PlacementOracle for Terrain {
    fn resolve(&self, kind: UnitKind, near: TilePosition) -> Option<TilePosition> {
        self.resolves.set(self.resolves.get() + 1);
        let reach = self.search_radius as i32;
        (0..=self.search_radius).find_map(|radius| {
            (-reach..=reach)
                .flat_map(|dy| (-reach..=reach).map(move |dx| (dx, dy)))
                .map(|(dx, dy)| TilePosition::new(near.x + dx, near.y + dy))
                .filter(|tile| tile.ring_distance(near) == radius)
                .find(|tile| self.fits(kind, *tile))
        })
    }

    fn is_valid(&self, kind: UnitKind, at: TilePosition, _worker: UnitId) -> bool {
        self.validations.set(self.validations.get() + 1);
        self.fits(kind, at)
    }
}
