use crate::entities::ids::ObjectId;
use crate::world::events::WorldEvent;
use std::collections::{BTreeSet, HashMap};

/// Objects whose saved form is out of date, fed from drained world
/// events.
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    changed: BTreeSet<ObjectId>,
    deleted: BTreeSet<ObjectId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveBatch {
    pub changed: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
}

impl SaveBatch {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, events: &[WorldEvent]) {
        for event in events {
            match event {
                WorldEvent::Deleted { entity } => {
                    self.changed.remove(entity);
                    self.deleted.insert(*entity);
                }
                WorldEvent::ContainmentChanged { item, old, new } => {
                    self.mark(*item);
                    // containers list their children, so both ends change
                    for holder in [old.parent(), new.parent()].into_iter().flatten() {
                        self.mark(holder);
                    }
                }
                other => self.mark(other.entity()),
            }
        }
    }

    pub fn mark(&mut self, id: ObjectId) {
        if !self.deleted.contains(&id) {
            self.changed.insert(id);
        }
    }

    pub fn is_dirty(&self, id: ObjectId) -> bool {
        self.changed.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.changed.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Hands out everything pending, in id order, and starts over.
    pub fn take(&mut self) -> SaveBatch {
        SaveBatch {
            changed: std::mem::take(&mut self.changed).into_iter().collect(),
            deleted: std::mem::take(&mut self.deleted).into_iter().collect(),
        }
    }

    /// Rewrites pending ids after identifier compaction. A renamed object
    /// is saved under its new number, which may be one still waiting to be
    /// deleted; that delete is dropped. Its old number is deleted unless
    /// another object took it over.
    pub fn remap(&mut self, mapping: &HashMap<ObjectId, ObjectId>) {
        let claimed: BTreeSet<ObjectId> = mapping.values().copied().collect();
        let rename = |id: ObjectId| mapping.get(&id).copied().unwrap_or(id);
        self.changed = self.changed.iter().copied().map(rename).collect();
        self.changed.extend(claimed.iter().copied());
        self.deleted.retain(|id| !claimed.contains(id));
        self.deleted
            .extend(mapping.keys().copied().filter(|old| !claimed.contains(old)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, GOLD};
    use crate::world::containment::Location;
    use crate::world::position::Point4D;

    #[test]
    fn moves_dirty_both_holders() {
        let mut fx = fixture();
        let gold = fx
            .world
            .create_item(GOLD, 3, Location::Ground(Point4D::new(100, 101, 0, 0)))
            .expect("gold");
        fx.world.drain_events();
        fx.world.pick_up(fx.alice, gold, None).expect("pick up");
        fx.world.put_in_container(fx.alice, fx.backpack, None).expect("put");

        let mut dirty = DirtySet::new();
        dirty.observe(&fx.world.drain_events());
        assert!(dirty.is_dirty(gold));
        assert!(dirty.is_dirty(fx.alice));
        assert!(dirty.is_dirty(fx.backpack));
        assert!(!dirty.is_dirty(fx.bob));
    }

    #[test]
    fn deletion_wins_over_changes() {
        let mut fx = fixture();
        let gold = fx
            .world
            .create_item(GOLD, 3, Location::Ground(Point4D::new(90, 90, 0, 0)))
            .expect("gold");
        fx.world.set_amount(gold, 4).expect("amount");
        fx.world.delete(gold).expect("delete");

        let mut dirty = DirtySet::new();
        dirty.observe(&fx.world.drain_events());
        dirty.mark(gold);
        let batch = dirty.take();
        assert!(!batch.changed.contains(&gold));
        assert_eq!(batch.deleted, vec![gold]);
        assert!(dirty.is_empty());
        assert!(dirty.take().is_empty());
    }

    #[test]
    fn compaction_renames_pending_entries() {
        let mut dirty = DirtySet::new();
        dirty.mark(ObjectId(9));
        dirty.mark(ObjectId(3));
        let mapping = [(ObjectId(9), ObjectId(2))].into_iter().collect();
        dirty.remap(&mapping);
        let batch = dirty.take();
        assert_eq!(batch.changed, vec![ObjectId(2), ObjectId(3)]);
        assert_eq!(batch.deleted, vec![ObjectId(9)]);
    }

    #[test]
    fn compaction_onto_a_pending_delete_keeps_the_live_object() {
        let mut fx = fixture();
        let gone = fx
            .world
            .create_item(GOLD, 1, Location::Ground(Point4D::new(90, 90, 0, 0)))
            .expect("gone");
        let kept = fx
            .world
            .create_item(GOLD, 2, Location::Ground(Point4D::new(91, 90, 0, 0)))
            .expect("kept");
        fx.world.delete(gone).expect("delete");

        let mut dirty = DirtySet::new();
        dirty.observe(&fx.world.drain_events());
        let mapping = fx.world.compact_ids().expect("compact");
        assert_eq!(mapping.get(&kept), Some(&gone));
        dirty.remap(&mapping);

        let batch = dirty.take();
        assert!(batch.changed.contains(&gone));
        assert!(!batch.deleted.contains(&gone));
        assert_eq!(batch.deleted, vec![kept]);
        assert_eq!(fx.world.item(gone).expect("renamed").amount(), 2);
        assert!(!fx.world.exists(kept));
    }
}
