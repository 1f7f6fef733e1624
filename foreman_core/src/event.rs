// World notifications and their routing to live tasks.
//
// The engine reports three things the task engine cares about: an entity
// was created, destroyed, or finished construction. The host pushes them
// into the `EventRouter` as they arrive between frames; the scheduler drains
// the router once per tick, before any task updates, so a task sees every
// notification of the previous frame before it decides its next step.
//
// Routing rules:
// - Notifications about entities the agent does not own are dropped.
// - `UnitCreated` is a correlation: at most one task claims it. Candidates
//   are tasks waiting in `AwaitingEntity` for an entity of the created kind,
//   offered in FIFO order of the frame they started waiting, then `TaskId`.
// - `UnitDestroyed` and `UnitCompleted` go to every live task; each task
//   only reacts if the entity is its worker or its observed entity.
//
// See also: `task.rs` for the `on_entity_*` callbacks, `scheduler.rs` for
// when dispatch happens within a tick.
//
// **Critical constraint: determinism.** Arrival order is preserved within a
// frame and the correlation order is a total order, so two runs fed the
// same notifications correlate the same way.

use crate::task::ConstructionTask;
use crate::types::{TaskId, UnitId, UnitKind};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::trace;

/// A reference to an engine entity, as carried by a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: UnitId,
    pub kind: UnitKind,
    /// Whether the entity belongs to this agent.
    pub owned: bool,
}

/// A world-change notification from the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    UnitCreated(EntityRef),
    UnitDestroyed(EntityRef),
    UnitCompleted(EntityRef),
}

impl WorldEvent {
    pub fn entity(&self) -> &EntityRef {
        match self {
            WorldEvent::UnitCreated(entity)
            | WorldEvent::UnitDestroyed(entity)
            | WorldEvent::UnitCompleted(entity) => entity,
        }
    }
}

/// What one `dispatch()` did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Routed {
    /// Creation notifications claimed, in arrival order.
    pub correlated: Vec<(TaskId, UnitId)>,
    /// Owned creations no task was waiting for.
    pub unclaimed: usize,
    /// Notifications about foreign entities.
    pub dropped: usize,
}

/// Buffers one frame's notifications until the scheduler drains them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventRouter {
    inbox: SmallVec<[WorldEvent; 8]>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: WorldEvent) {
        self.inbox.push(event);
    }

    /// Number of buffered notifications.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Deliver every buffered notification in arrival order.
    pub fn dispatch(&mut self, tasks: &mut BTreeMap<TaskId, ConstructionTask>) -> Routed {
        let mut routed = Routed::default();
        for event in self.inbox.drain(..) {
            let entity = *event.entity();
            if !entity.owned {
                trace!(?event, "dropping notification for a foreign entity");
                routed.dropped += 1;
                continue;
            }
            match event {
                WorldEvent::UnitCreated(_) => match correlate(tasks, &entity) {
                    Some(task) => routed.correlated.push((task, entity.id)),
                    None => {
                        trace!(
                            unit = %entity.id,
                            kind = ?entity.kind,
                            "no task awaiting created unit"
                        );
                        routed.unclaimed += 1;
                    }
                },
                WorldEvent::UnitDestroyed(_) => {
                    for task in tasks.values_mut() {
                        task.on_entity_destroyed(&entity);
                    }
                }
                WorldEvent::UnitCompleted(_) => {
                    for task in tasks.values_mut() {
                        task.on_entity_completed(&entity);
                    }
                }
            }
        }
        routed
    }
}

/// Offer a created entity to waiting tasks, oldest waiter first. Returns the
/// task that claimed it.
pub fn correlate(
    tasks: &mut BTreeMap<TaskId, ConstructionTask>,
    entity: &EntityRef,
) -> Option<TaskId> {
    let mut waiting: Vec<(u64, TaskId)> = tasks
        .values()
        .filter(|task| task.target() == entity.kind)
        .filter_map(|task| task.awaiting_since().map(|since| (since, task.id())))
        .collect();
    waiting.sort_unstable();
    waiting
        .into_iter()
        .find(|(_, id)| {
            tasks
                .get_mut(id)
                .is_some_and(|task| task.on_entity_created(entity))
        })
        .map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;
    use crate::testkit::{Rig, SCV};
    use crate::types::Cost;

    fn depot(id: u32) -> EntityRef {
        EntityRef {
            id: UnitId(id),
            kind: UnitKind::SupplyDepot,
            owned: true,
        }
    }

    /// Two depot tasks with their own workers, both waiting for an entity.
    /// Task 2 started waiting first.
    fn two_waiting_depots(rig: &mut Rig) -> BTreeMap<TaskId, ConstructionTask> {
        rig.pool.idle.push((UnitId(9), UnitKind::Scv));
        rig.units.positions.insert(UnitId(9), crate::types::Position::new(0, 0));
        let mut first = rig.task(1, UnitKind::SupplyDepot, false);
        let mut second = rig.task(2, UnitKind::SupplyDepot, false);
        assert!(rig.run_until(&mut second, TaskState::AwaitingEntity, 20));
        assert!(rig.run_until(&mut first, TaskState::AwaitingEntity, 20));
        assert!(second.awaiting_since() < first.awaiting_since());
        [first, second].into_iter().map(|t| (t.id(), t)).collect()
    }

    #[test]
    fn creation_goes_to_the_oldest_waiter() {
        let mut rig = Rig::new();
        let mut tasks = two_waiting_depots(&mut rig);
        let mut router = EventRouter::new();
        router.push(WorldEvent::UnitCreated(depot(50)));
        router.push(WorldEvent::UnitCreated(depot(51)));
        assert_eq!(router.pending(), 2);

        let routed = router.dispatch(&mut tasks);
        assert_eq!(
            routed.correlated,
            vec![(TaskId(2), UnitId(50)), (TaskId(1), UnitId(51))]
        );
        assert_eq!(router.pending(), 0);
        assert_eq!(tasks[&TaskId(2)].observed(), Some(UnitId(50)));
        assert_eq!(tasks[&TaskId(1)].observed(), Some(UnitId(51)));
    }

    #[test]
    fn surplus_creation_is_unclaimed() {
        let mut rig = Rig::new();
        let mut tasks = two_waiting_depots(&mut rig);
        let mut router = EventRouter::new();
        for id in 50..53 {
            router.push(WorldEvent::UnitCreated(depot(id)));
        }
        router.push(WorldEvent::UnitCreated(EntityRef {
            id: UnitId(60),
            kind: UnitKind::Marine,
            owned: true,
        }));
        let routed = router.dispatch(&mut tasks);
        assert_eq!(routed.correlated.len(), 2);
        assert_eq!(routed.unclaimed, 2);
    }

    #[test]
    fn foreign_entities_are_dropped() {
        let mut rig = Rig::new();
        let mut tasks = two_waiting_depots(&mut rig);
        let mut router = EventRouter::new();
        let foreign = EntityRef {
            owned: false,
            ..depot(50)
        };
        router.push(WorldEvent::UnitCreated(foreign));
        router.push(WorldEvent::UnitDestroyed(EntityRef {
            id: SCV,
            kind: UnitKind::Scv,
            owned: false,
        }));
        let routed = router.dispatch(&mut tasks);
        assert_eq!(routed.dropped, 2);
        assert!(routed.correlated.is_empty());
        assert!(tasks.values().all(|t| t.observed().is_none()));

        // The foreign destruction did not mark the worker lost.
        let task = tasks.get_mut(&TaskId(1)).unwrap();
        rig.config.entity_timeout_frames = 1000;
        rig.step(task);
        assert_eq!(*task.state(), TaskState::AwaitingEntity);
    }

    #[test]
    fn destruction_reaches_every_task() {
        let mut rig = Rig::new();
        let mut tasks = two_waiting_depots(&mut rig);
        let mut router = EventRouter::new();
        router.push(WorldEvent::UnitDestroyed(EntityRef {
            id: SCV,
            kind: UnitKind::Scv,
            owned: true,
        }));
        router.dispatch(&mut tasks);

        let losers: Vec<TaskId> = tasks
            .iter_mut()
            .filter_map(|(id, task)| {
                rig.step(task);
                matches!(task.state(), TaskState::Failed(_)).then_some(*id)
            })
            .collect();
        assert_eq!(losers.len(), 1, "only the task holding the SCV fails");
        assert_eq!(rig.ledger.held, Cost::new(100, 0));
    }

    #[test]
    fn completion_is_broadcast() {
        let mut rig = Rig::new();
        let mut tasks = two_waiting_depots(&mut rig);
        let mut router = EventRouter::new();
        router.push(WorldEvent::UnitCreated(depot(50)));
        router.push(WorldEvent::UnitCompleted(depot(50)));
        router.dispatch(&mut tasks);
        for task in tasks.values_mut() {
            rig.step(task);
            rig.step(task);
        }
        assert_eq!(*tasks[&TaskId(2)].state(), TaskState::Finalizing);
        assert_eq!(*tasks[&TaskId(1)].state(), TaskState::AwaitingEntity);
    }

    #[test]
    fn notifications_serialize_as_tagged_json() {
        let event = WorldEvent::UnitCreated(depot(7));
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"UnitCreated":{"id":7,"kind":"SupplyDepot","owned":true}}"#
        );
    }
}
