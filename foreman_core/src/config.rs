// Data-driven agent configuration.
//
// All tunable task-engine parameters live here in `AgentConfig`, loaded from
// JSON at startup. The state machine never uses magic numbers: proximity
// tolerance, retry bounds and timeouts are read from the config, and every
// target kind's price and timing come from the `unit_kinds` table (see
// `profile.rs`).
//
// Every field carries a serde default, so a config file only needs to name
// the values it overrides. `{}` is a valid config.
//
// See also: `task.rs` which reads `arrival_radius`, `max_placement_retries`
// and `entity_timeout_frames`, `scheduler.rs` which reads `retired_history`
// and resolves profiles at task creation.

use crate::error::{ForemanError, Result};
use crate::profile::{UnitProfile, terran_profiles};
use crate::types::UnitKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunable parameters for the construction task engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// A worker closer than this many pixels to its site counts as arrived.
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: u32,

    /// Consecutive placement rejections or refused build orders a task
    /// tolerates before it fails with `RetriesExhausted`.
    #[serde(default = "default_max_placement_retries")]
    pub max_placement_retries: u32,

    /// Frames `AwaitingEntity` waits for its correlating creation
    /// notification before treating the build order as lapsed.
    #[serde(default = "default_entity_timeout_frames")]
    pub entity_timeout_frames: u64,

    /// Number of retired tasks the scheduler keeps for `describe()`.
    #[serde(default = "default_retired_history")]
    pub retired_history: usize,

    /// Per-kind profiles. Kinds missing from this table cannot be tasked.
    #[serde(default = "terran_profiles")]
    pub unit_kinds: BTreeMap<UnitKind, UnitProfile>,
}

fn default_arrival_radius() -> u32 {
    20
}

fn default_max_placement_retries() -> u32 {
    16
}

fn default_entity_timeout_frames() -> u64 {
    240
}

fn default_retired_history() -> usize {
    32
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            arrival_radius: default_arrival_radius(),
            max_placement_retries: default_max_placement_retries(),
            entity_timeout_frames: default_entity_timeout_frames(),
            retired_history: default_retired_history(),
            unit_kinds: terran_profiles(),
        }
    }
}

impl AgentConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up the profile for a kind.
    pub fn profile(&self, kind: UnitKind) -> Result<&UnitProfile> {
        self.unit_kinds
            .get(&kind)
            .ok_or(ForemanError::UnknownUnitKind(kind))
    }
}
