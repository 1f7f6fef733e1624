// Worker pool of the fake engine.
//
// Every finished unit the agent owns is enlisted here with its kind, last
// known position and a busy flag. Tasks acquire by kind: SCVs for
// structures, the producing structure for trained units. The engine copies
// unit positions in once per frame so "nearest" means nearest now.

use foreman_core::services::WorkerPool;
use foreman_core::types::{Position, UnitId, UnitKind};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Clone, Debug)]
struct Member {
    kind: UnitKind,
    position: Position,
    busy: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Roster {
    members: BTreeMap<UnitId, Member>,
    pub acquisitions: u32,
    pub returns: u32,
}

impl Roster {
    pub fn enlist(&mut self, id: UnitId, kind: UnitKind, position: Position) {
        self.members.insert(
            id,
            Member {
                kind,
                position,
                busy: false,
            },
        );
    }

    pub fn discharge(&mut self, id: UnitId) {
        self.members.remove(&id);
    }

    pub fn update_position(&mut self, id: UnitId, position: Position) {
        if let Some(member) = self.members.get_mut(&id) {
            member.position = position;
        }
    }

    /// `None` if the unit is not enlisted.
    pub fn is_busy(&self, id: UnitId) -> Option<bool> {
        self.members.get(&id).map(|m| m.busy)
    }

    /// Idle members of `kind`.
    pub fn idle(&self, kind: UnitKind) -> usize {
        self.members
            .values()
            .filter(|m| m.kind == kind && !m.busy)
            .count()
    }
}

impl WorkerPool for Roster {
    fn acquire(&mut self, capability: UnitKind, near: Position) -> Option<UnitId> {
        let (&id, member) = self
            .members
            .iter_mut()
            .filter(|(_, m)| m.kind == capability && !m.busy)
            .min_by_key(|(id, m)| (m.position.distance(near), **id))?;
        member.busy = true;
        self.acquisitions += 1;
        trace!(unit = %id, ?capability, %near, "worker acquired");
        Some(id)
    }

    fn release(&mut self, worker: UnitId) {
        self.returns += 1;
        if let Some(member) = self.members.get_mut(&worker) {
            member.busy = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_idle_unit_of_the_kind_wins() {
        let mut roster = Roster::default();
        roster.enlist(UnitId(1), UnitKind::Scv, Position::new(0, 0));
        roster.enlist(UnitId(2), UnitKind::Scv, Position::new(300, 0));
        roster.enlist(UnitId(3), UnitKind::Barracks, Position::new(310, 0));

        let near = Position::new(320, 0);
        assert_eq!(roster.acquire(UnitKind::Scv, near), Some(UnitId(2)));
        assert_eq!(roster.acquire(UnitKind::Scv, near), Some(UnitId(1)));
        assert_eq!(roster.acquire(UnitKind::Scv, near), None);
        assert_eq!(roster.idle(UnitKind::Barracks), 1);

        roster.release(UnitId(2));
        assert_eq!(roster.is_busy(UnitId(2)), Some(false));
        roster.discharge(UnitId(1));
        roster.release(UnitId(1));
        assert_eq!(roster.is_busy(UnitId(1)), None);
    }
}
