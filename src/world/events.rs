use crate::entities::ids::ObjectId;
use crate::world::containment::Location;
use crate::world::position::{Direction, Point4D};
use std::collections::VecDeque;

/// Committed state changes, queued for observers (network, persistence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    Created {
        entity: ObjectId,
    },
    ContainmentChanged {
        item: ObjectId,
        old: Location,
        new: Location,
    },
    PositionChanged {
        entity: ObjectId,
        old: Point4D,
        new: Point4D,
    },
    AmountChanged {
        item: ObjectId,
        old: u32,
        new: u32,
    },
    DirectionChanged {
        entity: ObjectId,
        old: Direction,
        new: Direction,
    },
    /// A persisted attribute without an event of its own was written.
    FieldChanged {
        entity: ObjectId,
        field: &'static str,
    },
    Deleted {
        entity: ObjectId,
    },
}

impl WorldEvent {
    pub fn entity(&self) -> ObjectId {
        match self {
            WorldEvent::Created { entity }
            | WorldEvent::PositionChanged { entity, .. }
            | WorldEvent::DirectionChanged { entity, .. }
            | WorldEvent::FieldChanged { entity, .. }
            | WorldEvent::Deleted { entity } => *entity,
            WorldEvent::ContainmentChanged { item, .. } | WorldEvent::AmountChanged { item, .. } => {
                *item
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    pending: VecDeque<WorldEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: WorldEvent) {
        self.pending.push_back(event);
    }

    /// Drops the most recent matching event, used when the change it
    /// announced was rolled back.
    pub(crate) fn retract(&mut self, event: &WorldEvent) -> bool {
        match self.pending.iter().rposition(|pending| pending == event) {
            Some(index) => self.pending.remove(index).is_some(),
            None => false,
        }
    }

    pub fn drain(&mut self) -> Vec<WorldEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retract_drops_only_the_latest_match() {
        let mut queue = EventQueue::default();
        let created = WorldEvent::Created { entity: ObjectId(1) };
        queue.push(created.clone());
        queue.push(WorldEvent::Deleted { entity: ObjectId(2) });
        queue.push(created.clone());
        assert!(queue.retract(&created));
        assert_eq!(
            queue.drain(),
            vec![created, WorldEvent::Deleted { entity: ObjectId(2) }]
        );
        assert!(!queue.retract(&WorldEvent::Created { entity: ObjectId(9) }));
        assert!(queue.is_empty());
    }
}
