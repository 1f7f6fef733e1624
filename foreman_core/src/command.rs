// Commands from the strategic layer.
//
// The strategic layer decides *what* to build and *when*; it reaches the
// task engine either through the direct `TaskScheduler::create_task` /
// `cancel` calls or by queueing an `AgentCommand` and handing it to
// `TaskScheduler::apply_command`. Commands are plain serde data so they can
// be logged, replayed in tests, or produced by a scripted build order.
//
// See also: `scheduler.rs` for `apply_command()`.

use crate::types::{Priority, TaskId, TilePosition, UnitKind};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentCommand {
    /// Queue a new construction task.
    CreateTask {
        target: UnitKind,
        #[serde(default)]
        priority: Priority,
        location: TilePosition,
        #[serde(default)]
        exact: bool,
    },
    /// Cancel a queued or live task. Unknown ids are ignored.
    CancelTask { task_id: TaskId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_order_script_parses() {
        let json = r#"[
            { "CreateTask": { "target": "SupplyDepot", "location": { "x": 40, "y": 12 } } },
            { "CreateTask": { "target": "Barracks", "priority": "High",
                              "location": { "x": 44, "y": 14 }, "exact": true } },
            { "CancelTask": { "task_id": 1 } }
        ]"#;
        let commands: Vec<AgentCommand> = serde_json::from_str(json).unwrap();
        assert_eq!(
            commands[0],
            AgentCommand::CreateTask {
                target: UnitKind::SupplyDepot,
                priority: Priority::Normal,
                location: TilePosition::new(40, 12),
                exact: false,
            }
        );
        assert!(matches!(
            commands[1],
            AgentCommand::CreateTask {
                priority: Priority::High,
                exact: true,
                ..
            }
        ));
        assert_eq!(commands[2], AgentCommand::CancelTask { task_id: TaskId(1) });
    }
}
