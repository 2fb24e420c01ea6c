use crate::entities::ids::ObjectId;
use crate::entities::layer::LayerGroup;
use crate::error::WorldError;
use crate::world::state::World;

/// Head of an intrusive doubly-linked list of items. The links live on the
/// items themselves, so insertion order is preserved and removal is O(1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildList {
    pub(crate) head: Option<ObjectId>,
    pub(crate) tail: Option<ObjectId>,
    pub(crate) len: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    pub(crate) prev: Option<ObjectId>,
    pub(crate) next: Option<ObjectId>,
}

impl ChildList {
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<ObjectId> {
        self.head
    }
}

/// Which list a child is linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListOwner {
    Container(ObjectId),
    Character(ObjectId, LayerGroup),
}

impl World {
    pub(crate) fn child_list(&self, owner: ListOwner) -> Result<ChildList, WorldError> {
        match owner {
            ListOwner::Container(container) => {
                Ok(self.item(container)?.contents.unwrap_or_default())
            }
            ListOwner::Character(character, group) => Ok(self.character(character)?.group(group)),
        }
    }

    pub(crate) fn store_child_list(
        &mut self,
        owner: ListOwner,
        list: ChildList,
    ) -> Result<(), WorldError> {
        match owner {
            ListOwner::Container(container) => {
                self.item_mut(container)?.contents = Some(list);
            }
            ListOwner::Character(character, group) => {
                let slot = self
                    .character_mut(character)?
                    .group_mut(group)
                    .ok_or_else(|| {
                        WorldError::Invariant(format!("{character} has no list for {group:?}"))
                    })?;
                *slot = list;
            }
        }
        Ok(())
    }

    pub(crate) fn link_back(&mut self, owner: ListOwner, item: ObjectId) -> Result<(), WorldError> {
        let mut list = self.child_list(owner)?;
        let tail = list.tail;
        self.item_mut(item)?.links = Links { prev: tail, next: None };
        match tail {
            Some(tail) => self.item_mut(tail)?.links.next = Some(item),
            None => list.head = Some(item),
        }
        list.tail = Some(item);
        list.len += 1;
        self.store_child_list(owner, list)
    }

    pub(crate) fn unlink(&mut self, owner: ListOwner, item: ObjectId) -> Result<(), WorldError> {
        let mut list = self.child_list(owner)?;
        let Links { prev, next } = self.item(item)?.links;
        match prev {
            Some(prev) => self.item_mut(prev)?.links.next = next,
            None => list.head = next,
        }
        match next {
            Some(next) => self.item_mut(next)?.links.prev = prev,
            None => list.tail = prev,
        }
        self.item_mut(item)?.links = Links::default();
        list.len = list.len.checked_sub(1).ok_or_else(|| {
            WorldError::Invariant(format!("unlinking {item} from an empty list"))
        })?;
        self.store_child_list(owner, list)
    }

    /// Snapshot of a list in insertion order.
    pub(crate) fn list_ids(&self, list: ChildList) -> Vec<ObjectId> {
        let mut ids = Vec::with_capacity(list.len as usize);
        let mut cursor = list.head;
        while let Some(id) = cursor {
            ids.push(id);
            if ids.len() > list.len as usize {
                break;
            }
            cursor = self.item(id).ok().and_then(|item| item.links.next);
        }
        ids
    }
}
