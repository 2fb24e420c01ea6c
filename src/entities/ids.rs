use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifier shared by items and characters. Persistent ids index the
/// registry directly; transient ids carry the high bit and never resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

pub const TRANSIENT_FLAG: u32 = 0x8000_0000;

impl ObjectId {
    pub fn is_transient(self) -> bool {
        self.0 & TRANSIENT_FLAG != 0
    }

    fn index(self) -> Option<usize> {
        if self.is_transient() || self.0 == 0 {
            None
        } else {
            Some(self.0 as usize)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Live(T),
    Released,
}

/// Dense id -> object table. Released ids stay retired until `compact`
/// renumbers the survivors, so a stale reference can never alias a newer
/// object.
#[derive(Debug, Clone)]
pub struct IdentityRegistry<T> {
    slots: Vec<Slot<T>>,
    live: usize,
    next_transient: u32,
    free_transient: Vec<u32>,
    live_transient: HashSet<u32>,
}

impl<T> Default for IdentityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdentityRegistry<T> {
    pub fn new() -> Self {
        Self {
            // slot 0 is never handed out
            slots: vec![Slot::Released],
            live: 0,
            next_transient: 1,
            free_transient: Vec::new(),
            live_transient: HashSet::new(),
        }
    }

    /// Id the next `allocate_with` call will hand out.
    pub fn peek_next(&self) -> ObjectId {
        ObjectId(self.slots.len() as u32)
    }

    pub fn allocate_with(&mut self, build: impl FnOnce(ObjectId) -> T) -> ObjectId {
        let id = self.peek_next();
        self.slots.push(Slot::Live(build(id)));
        self.live += 1;
        id
    }

    pub fn resolve(&self, id: ObjectId) -> Option<&T> {
        match self.slots.get(id.index()?)? {
            Slot::Live(value) => Some(value),
            Slot::Released => None,
        }
    }

    pub fn resolve_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        let index = id.index()?;
        match self.slots.get_mut(index)? {
            Slot::Live(value) => Some(value),
            Slot::Released => None,
        }
    }

    /// True for ids that were handed out and have since been released.
    pub fn is_released(&self, id: ObjectId) -> bool {
        matches!(
            id.index().and_then(|index| self.slots.get(index)),
            Some(Slot::Released)
        )
    }

    pub fn release(&mut self, id: ObjectId) -> Option<T> {
        let index = id.index()?;
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, Slot::Released) {
            Slot::Live(value) => {
                self.live -= 1;
                Some(value)
            }
            Slot::Released => None,
        }
    }

    pub fn allocate_transient(&mut self) -> ObjectId {
        let raw = match self.free_transient.pop() {
            Some(raw) => raw,
            None => {
                let raw = self.next_transient;
                self.next_transient = self.next_transient.wrapping_add(1) & !TRANSIENT_FLAG;
                raw
            }
        };
        self.live_transient.insert(raw);
        ObjectId(raw | TRANSIENT_FLAG)
    }

    pub fn is_transient_live(&self, id: ObjectId) -> bool {
        id.is_transient() && self.live_transient.contains(&(id.0 & !TRANSIENT_FLAG))
    }

    pub fn release_transient(&mut self, id: ObjectId) -> bool {
        if !id.is_transient() {
            return false;
        }
        let raw = id.0 & !TRANSIENT_FLAG;
        if self.live_transient.remove(&raw) {
            self.free_transient.push(raw);
            true
        } else {
            false
        }
    }

    /// Renumbers live entries densely, keeping their relative order.
    /// Returns old -> new for every id that changed.
    pub fn compact(&mut self) -> HashMap<ObjectId, ObjectId> {
        let old = std::mem::replace(&mut self.slots, vec![Slot::Released]);
        let mut remap = HashMap::new();
        for (index, slot) in old.into_iter().enumerate() {
            if let Slot::Live(value) = slot {
                let new_id = ObjectId(self.slots.len() as u32);
                if new_id.0 as usize != index {
                    remap.insert(ObjectId(index as u32), new_id);
                }
                self.slots.push(Slot::Live(value));
            }
        }
        remap
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Live(value) => Some((ObjectId(index as u32), value)),
                Slot::Released => None,
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Live(value) => Some((ObjectId(index as u32), value)),
                Slot::Released => None,
            })
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_resolve() {
        let mut registry = IdentityRegistry::new();
        let a = registry.allocate_with(|id| (id, "a"));
        let b = registry.allocate_with(|id| (id, "b"));
        assert_ne!(a, b);
        assert_eq!(registry.resolve(a), Some(&(a, "a")));
        assert_eq!(registry.resolve(b).map(|entry| entry.1), Some("b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn zero_and_unknown_ids_do_not_resolve() {
        let mut registry = IdentityRegistry::new();
        registry.allocate_with(|_| 1u8);
        assert!(registry.resolve(ObjectId(0)).is_none());
        assert!(registry.resolve(ObjectId(99)).is_none());
        assert!(!registry.is_released(ObjectId(0)));
        assert!(!registry.is_released(ObjectId(99)));
    }

    #[test]
    fn released_ids_are_not_reused_before_compaction() {
        let mut registry = IdentityRegistry::new();
        let first = registry.allocate_with(|_| "first");
        assert_eq!(registry.release(first), Some("first"));
        assert!(registry.resolve(first).is_none());
        assert!(registry.is_released(first));
        let second = registry.allocate_with(|_| "second");
        assert_ne!(first, second);
        assert!(registry.resolve(first).is_none());
        assert_eq!(registry.release(first), None);
    }

    #[test]
    fn compaction_renumbers_in_order() {
        let mut registry = IdentityRegistry::new();
        let ids: Vec<ObjectId> = (0..5).map(|n| registry.allocate_with(|_| n)).collect();
        registry.release(ids[1]);
        registry.release(ids[3]);
        let remap = registry.compact();
        assert_eq!(registry.len(), 3);
        assert_eq!(remap.get(&ids[0]), None);
        assert_eq!(remap.get(&ids[2]), Some(&ids[1]));
        assert_eq!(remap.get(&ids[4]), Some(&ids[2]));
        assert_eq!(registry.resolve(ids[1]), Some(&2));
        assert_eq!(registry.resolve(ids[2]), Some(&4));
        assert_eq!(registry.peek_next(), ids[3]);
    }

    #[test]
    fn transient_ids_live_in_their_own_space() {
        let mut registry: IdentityRegistry<u8> = IdentityRegistry::new();
        let persistent = registry.allocate_with(|_| 7);
        let transient = registry.allocate_transient();
        assert!(transient.is_transient());
        assert!(!persistent.is_transient());
        assert!(registry.resolve(transient).is_none());
        assert!(registry.is_transient_live(transient));
        assert!(registry.release_transient(transient));
        assert!(!registry.release_transient(transient));
        assert!(!registry.release_transient(persistent));
        let again = registry.allocate_transient();
        assert_eq!(again, transient);
        assert_eq!(registry.len(), 1);
    }
}
