// Frame dispatcher: owns the live tasks and advances them once per frame.
//
// `TaskScheduler` is the host-facing entry point of the crate. The host
// calls `tick()` exactly once per simulation frame, handing in the
// collaborators as a `Services` bundle. Between ticks it may create or
// cancel tasks and push world notifications; all three are queued and
// applied at the start of the next tick, never spliced into an update pass
// that is already running.
//
// One tick, in order:
//   1. Admit tasks created since the last tick.
//   2. Apply queued cancellations (release held resources and workers).
//   3. Drain the event router into the live tasks (see `event.rs`).
//   4. `update()` every live task once, in `TaskId` order (= creation order).
//      Priority is advisory and not consulted here.
//   5. Remove tasks that reached a terminal state and report them.
//
// Retired tasks are remembered (up to `config.retired_history`, and always
// at least the latest tick's) so that `describe()` keeps answering for a
// handle the strategic layer still holds.
//
// See also: `task.rs` for the per-task state machine, `command.rs` for the
// command-style entry point.

use crate::command::AgentCommand;
use crate::config::AgentConfig;
use crate::error::{ForemanError, Result};
use crate::event::{EventRouter, WorldEvent};
use crate::services::Services;
use crate::task::{ConstructionTask, FailureReason, TaskState, Transition};
use crate::types::{Priority, TaskId, TilePosition, UnitKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

/// How a retired task ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Completed,
    Failed(FailureReason),
    Cancelled,
}

impl TaskOutcome {
    fn of(state: &TaskState) -> Option<Self> {
        match state {
            TaskState::Complete => Some(TaskOutcome::Completed),
            TaskState::Failed(reason) => Some(TaskOutcome::Failed(reason.clone())),
            TaskState::Cancelled => Some(TaskOutcome::Cancelled),
            _ => None,
        }
    }
}

/// A task removed from the live set, as reported to the strategic layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredTask {
    pub id: TaskId,
    pub target: UnitKind,
    pub outcome: TaskOutcome,
    /// Frame the task was removed.
    pub frame: u64,
    /// Final `describe()` line.
    pub description: String,
}

/// Everything that happened in one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub frame: u64,
    pub transitions: Vec<Transition>,
    pub retired: Vec<RetiredTask>,
}

#[derive(Debug, Default, Serialize)]
pub struct TaskScheduler {
    frame: u64,
    next_id: u64,
    tasks: BTreeMap<TaskId, ConstructionTask>,
    /// Created since the last tick; admitted at the start of the next one.
    incoming: Vec<ConstructionTask>,
    cancellations: Vec<TaskId>,
    router: EventRouter,
    retired: VecDeque<RetiredTask>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames ticked so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Queue a new task. The handle is valid immediately; the task goes live
    /// at the start of the next tick.
    pub fn create_task(
        &mut self,
        config: &AgentConfig,
        target: UnitKind,
        priority: Priority,
        location: TilePosition,
        exact: bool,
    ) -> Result<TaskId> {
        let profile = config.profile(target)?.clone();
        self.next_id += 1;
        let id = TaskId(self.next_id);
        debug!(task = %id, ?target, ?priority, %location, exact, "task queued");
        self.incoming.push(ConstructionTask::new(
            id, target, profile, priority, location, exact,
        ));
        Ok(id)
    }

    /// Queue a cancellation for the next tick.
    pub fn cancel(&mut self, id: TaskId) -> Result<()> {
        let known = self.tasks.contains_key(&id) || self.incoming.iter().any(|t| t.id() == id);
        if !known {
            return Err(ForemanError::UnknownTask(id));
        }
        self.cancellations.push(id);
        Ok(())
    }

    /// Buffer a world notification for the next tick.
    pub fn notify(&mut self, event: WorldEvent) {
        self.router.push(event);
    }

    /// Apply a strategic-layer command. Returns the new handle for
    /// `CreateTask`. Cancelling an unknown task is not an error here; the
    /// task may already have retired.
    pub fn apply_command(
        &mut self,
        config: &AgentConfig,
        command: &AgentCommand,
    ) -> Result<Option<TaskId>> {
        match *command {
            AgentCommand::CreateTask {
                target,
                priority,
                location,
                exact,
            } => self
                .create_task(config, target, priority, location, exact)
                .map(Some),
            AgentCommand::CancelTask { task_id } => match self.cancel(task_id) {
                Ok(()) | Err(ForemanError::UnknownTask(_)) => Ok(None),
                Err(err) => Err(err),
            },
        }
    }

    /// Advance every live task by one frame.
    pub fn tick(&mut self, services: &mut Services<'_>) -> TickReport {
        self.frame += 1;
        let frame = self.frame;
        let mut report = TickReport {
            frame,
            ..TickReport::default()
        };

        for task in self.incoming.drain(..) {
            self.tasks.insert(task.id(), task);
        }

        for id in self.cancellations.drain(..) {
            let cancelled = self
                .tasks
                .get_mut(&id)
                .and_then(|task| task.cancel(frame, services));
            report.transitions.extend(cancelled);
        }

        let routed = self.router.dispatch(&mut self.tasks);
        for (task, unit) in &routed.correlated {
            debug!(%task, %unit, frame, "entity correlated");
        }

        for task in self.tasks.values_mut() {
            report.transitions.extend(task.update(frame, services));
        }

        let finished: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.state().is_terminal())
            .map(|(id, _)| *id)
            .collect();
        for id in finished {
            let Some(task) = self.tasks.remove(&id) else {
                continue;
            };
            let Some(outcome) = TaskOutcome::of(task.state()) else {
                continue;
            };
            let retired = RetiredTask {
                id,
                target: task.target(),
                outcome,
                frame,
                description: task.describe(),
            };
            info!(
                task = %id,
                target = ?retired.target,
                outcome = ?retired.outcome,
                frame,
                "task retired"
            );
            self.retired.push_back(retired.clone());
            report.retired.push(retired);
        }
        // This frame's retirees stay describable until the next tick.
        let keep = services.config.retired_history.max(report.retired.len());
        while self.retired.len() > keep {
            self.retired.pop_front();
        }

        report
    }

    /// Status line for a task handle: queued, live, or recently retired.
    pub fn describe(&self, id: TaskId) -> String {
        if let Some(task) = self.get(id) {
            return task.describe();
        }
        if let Some(task) = self.incoming.iter().find(|t| t.id() == id) {
            return task.describe();
        }
        self.retired
            .iter()
            .rev()
            .find(|r| r.id == id)
            .map(|r| r.description.clone())
            .unwrap_or_else(|| format!("{id}: no such task"))
    }

    /// `describe()` of every live task, oldest first.
    pub fn status_lines(&self) -> Vec<String> {
        self.tasks.values().map(ConstructionTask::describe).collect()
    }

    pub fn get(&self, id: TaskId) -> Option<&ConstructionTask> {
        self.tasks.get(&id)
    }

    /// Live tasks, in update order.
    pub fn tasks(&self) -> impl Iterator<Item = &ConstructionTask> {
        self.tasks.values()
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks created but not yet admitted.
    pub fn queued(&self) -> usize {
        self.incoming.len()
    }

    /// Recently retired tasks, oldest first.
    pub fn retired(&self) -> impl Iterator<Item = &RetiredTask> {
        self.retired.iter()
    }

    /// Snapshot of the scheduler for logs and debugging.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
