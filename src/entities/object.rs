use crate::entities::character::Character;
use crate::entities::defs::DefId;
use crate::entities::ids::ObjectId;
use crate::entities::item::Item;
use crate::world::position::Point4D;

#[derive(Debug, Clone)]
pub enum WorldObject {
    Item(Item),
    Character(Character),
}

impl WorldObject {
    pub fn id(&self) -> ObjectId {
        match self {
            WorldObject::Item(item) => item.id,
            WorldObject::Character(character) => character.id,
        }
    }

    pub fn def(&self) -> DefId {
        match self {
            WorldObject::Item(item) => item.def,
            WorldObject::Character(character) => character.def,
        }
    }

    /// Own point: map coordinates for characters and ground items,
    /// container-local coordinates otherwise.
    pub fn point(&self) -> Point4D {
        match self {
            WorldObject::Item(item) => item.point,
            WorldObject::Character(character) => character.point,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            WorldObject::Item(item) => Some(item),
            WorldObject::Character(_) => None,
        }
    }

    pub fn as_character(&self) -> Option<&Character> {
        match self {
            WorldObject::Character(character) => Some(character),
            WorldObject::Item(_) => None,
        }
    }

    pub fn is_character(&self) -> bool {
        matches!(self, WorldObject::Character(_))
    }
}
