use crate::entities::defs::{DefId, ThingDef};
use crate::entities::ids::ObjectId;
use crate::entities::layer::Layer;
use crate::world::child_list::{ChildList, Links};
use crate::world::containment::Location;
use crate::world::position::Point4D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ItemFlags(u8);

impl ItemFlags {
    /// Containers refuse items going in or out.
    pub const LOCKED: ItemFlags = ItemFlags(0x01);
    /// Cannot be picked up at all.
    pub const IMMOVABLE: ItemFlags = ItemFlags(0x02);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: ItemFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ItemFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ItemFlags) {
        self.0 &= !other.0;
    }
}

/// An item instance. Its location is encoded by `parent`, `layer` and
/// `point`:
/// ground items have no parent and a map point, contained items keep
/// gump coordinates in `point`, and equipped or dragged items record the
/// layer. Only the containment store writes these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) id: ObjectId,
    pub(crate) def: DefId,
    pub(crate) model: u16,
    pub(crate) color: u16,
    pub(crate) created_at: u64,
    pub(crate) name: Option<String>,
    pub(crate) flags: ItemFlags,
    pub(crate) amount: u32,
    pub(crate) unit_weight: u32,
    pub(crate) point: Point4D,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) layer: Option<Layer>,
    pub(crate) links: Links,
    pub(crate) contents: Option<ChildList>,
    pub(crate) contained_weight: u64,
    pub(crate) detached_from: Option<Location>,
}

impl Item {
    pub(crate) fn new(id: ObjectId, def: &ThingDef, created_at: u64) -> Self {
        Self {
            id,
            def: def.id,
            model: def.model,
            color: 0,
            created_at,
            name: None,
            flags: ItemFlags::empty(),
            amount: 1,
            unit_weight: def.weight,
            point: Point4D::LIMBO,
            parent: None,
            layer: None,
            links: Links::default(),
            contents: None,
            contained_weight: 0,
            detached_from: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn def(&self) -> DefId {
        self.def
    }

    pub fn model(&self) -> u16 {
        self.model
    }

    pub fn color(&self) -> u16 {
        self.color
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn flags(&self) -> ItemFlags {
        self.flags
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn point(&self) -> Point4D {
        self.point
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn layer(&self) -> Option<Layer> {
        self.layer
    }

    pub fn is_limbo(&self) -> bool {
        self.parent.is_none() && self.point.is_limbo()
    }

    pub fn is_on_ground(&self) -> bool {
        self.parent.is_none() && !self.point.is_limbo()
    }

    pub fn own_weight(&self) -> u64 {
        u64::from(self.unit_weight) * u64::from(self.amount)
    }

    pub fn contained_weight(&self) -> u64 {
        self.contained_weight
    }

    pub fn total_weight(&self) -> u64 {
        self.own_weight() + self.contained_weight
    }

    pub fn child_count(&self) -> u32 {
        self.contents.map(|list| list.len()).unwrap_or(0)
    }
}
