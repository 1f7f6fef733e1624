// Unit profiles: data-driven description of every constructible kind.
//
// All behavioral differences between target kinds (what they cost, how long
// they take, whether they are placed on the map or trained inside a
// producer, and which kind produces them) are expressed as data in
// `UnitProfile`, keyed by `UnitKind` in the agent config. The task state
// machine reads these values at runtime; there is no code branching per kind.
//
// See also: `config.rs` where the profile table lives, `task.rs` which
// copies a profile into each task at creation so reservation and release
// always use the same cost.

use crate::types::{Cost, UnitKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data-driven parameters for one constructible kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProfile {
    /// Human-readable name used in status strings.
    pub name: String,

    /// Price in both currencies.
    pub cost: Cost,

    /// Total construction time in engine frames.
    pub build_time: u32,

    /// True for structures placed on the build grid. False for units
    /// trained inside a producer.
    pub stationary: bool,

    /// The kind of entity able to construct or train this kind.
    pub builder: UnitKind,

    /// Footprint on the build grid, `(width, height)` in tiles.
    #[serde(default = "default_footprint")]
    pub footprint: (u32, u32),
}

fn default_footprint() -> (u32, u32) {
    (1, 1)
}

impl UnitProfile {
    fn structure(name: &str, cost: Cost, build_time: u32, footprint: (u32, u32)) -> Self {
        Self {
            name: name.to_string(),
            cost,
            build_time,
            stationary: true,
            builder: UnitKind::Scv,
            footprint,
        }
    }

    fn trained(name: &str, cost: Cost, build_time: u32, builder: UnitKind) -> Self {
        Self {
            name: name.to_string(),
            cost,
            build_time,
            stationary: false,
            builder,
            footprint: (1, 1),
        }
    }
}

/// The Terran roster with the engine's own prices and frame timings.
pub fn terran_profiles() -> BTreeMap<UnitKind, UnitProfile> {
    use UnitKind::*;

    let mut table = BTreeMap::new();
    table.insert(
        Scv,
        UnitProfile::trained("Terran SCV", Cost::new(50, 0), 300, CommandCenter),
    );
    table.insert(
        Marine,
        UnitProfile::trained("Terran Marine", Cost::new(50, 0), 360, Barracks),
    );
    table.insert(
        Firebat,
        UnitProfile::trained("Terran Firebat", Cost::new(50, 25), 360, Barracks),
    );
    table.insert(
        Medic,
        UnitProfile::trained("Terran Medic", Cost::new(50, 25), 450, Barracks),
    );
    table.insert(
        Vulture,
        UnitProfile::trained("Terran Vulture", Cost::new(75, 0), 450, Factory),
    );
    table.insert(
        SiegeTank,
        UnitProfile::trained("Terran Siege Tank", Cost::new(150, 100), 750, Factory),
    );
    table.insert(
        CommandCenter,
        UnitProfile::structure("Terran Command Center", Cost::new(400, 0), 1800, (4, 3)),
    );
    table.insert(
        SupplyDepot,
        UnitProfile::structure("Terran Supply Depot", Cost::new(100, 0), 600, (3, 2)),
    );
    table.insert(
        Refinery,
        UnitProfile::structure("Terran Refinery", Cost::new(100, 0), 600, (4, 2)),
    );
    table.insert(
        Barracks,
        UnitProfile::structure("Terran Barracks", Cost::new(150, 0), 1200, (4, 3)),
    );
    table.insert(
        EngineeringBay,
        UnitProfile::structure("Terran Engineering Bay", Cost::new(125, 0), 900, (4, 3)),
    );
    table.insert(
        Bunker,
        UnitProfile::structure("Terran Bunker", Cost::new(100, 0), 450, (3, 2)),
    );
    table.insert(
        Academy,
        UnitProfile::structure("Terran Academy", Cost::new(150, 0), 1200, (3, 2)),
    );
    table.insert(
        Factory,
        UnitProfile::structure("Terran Factory", Cost::new(200, 100), 1200, (4, 3)),
    );
    table
}
