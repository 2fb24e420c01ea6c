use crate::entities::ids::ObjectId;
use crate::entities::layer::{Layer, LayerGroup};
use crate::entities::object::WorldObject;
use crate::error::WorldError;
use crate::world::child_list::ListOwner;
use crate::world::events::WorldEvent;
use crate::world::position::Point4D;
use crate::world::state::World;
use tracing::{debug, trace};

/// Smallest and largest gump coordinate inside a container.
pub const CONTAINER_MIN_XY: u16 = 20;
pub const CONTAINER_MAX_XY: u16 = 120;

/// Where an item is. Every live item is in exactly one of these at rest;
/// `Limbo` only ever lasts for the duration of a single store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Limbo,
    Ground(Point4D),
    Container { container: ObjectId, x: u16, y: u16 },
    Layer { character: ObjectId, layer: Layer },
    Dragging { character: ObjectId },
}

impl Location {
    pub fn parent(&self) -> Option<ObjectId> {
        match *self {
            Location::Limbo | Location::Ground(_) => None,
            Location::Container { container, .. } => Some(container),
            Location::Layer { character, .. } | Location::Dragging { character } => Some(character),
        }
    }

    pub fn is_limbo(&self) -> bool {
        matches!(self, Location::Limbo)
    }

    pub(crate) fn remap(self, map: &impl Fn(ObjectId) -> ObjectId) -> Self {
        match self {
            Location::Limbo | Location::Ground(_) => self,
            Location::Container { container, x, y } => Location::Container {
                container: map(container),
                x,
                y,
            },
            Location::Layer { character, layer } => Location::Layer {
                character: map(character),
                layer,
            },
            Location::Dragging { character } => Location::Dragging {
                character: map(character),
            },
        }
    }
}

pub fn clamp_container_xy(x: u16, y: u16) -> (u16, u16) {
    (
        x.clamp(CONTAINER_MIN_XY, CONTAINER_MAX_XY),
        y.clamp(CONTAINER_MIN_XY, CONTAINER_MAX_XY),
    )
}

impl World {
    pub fn location_of(&self, id: ObjectId) -> Result<Location, WorldError> {
        let item = self.item(id)?;
        let Some(parent) = item.parent else {
            if item.point.is_limbo() {
                return Ok(Location::Limbo);
            }
            return Ok(Location::Ground(item.point));
        };
        match self.object(parent)? {
            WorldObject::Item(_) => Ok(Location::Container {
                container: parent,
                x: item.point.x,
                y: item.point.y,
            }),
            WorldObject::Character(_) => match item.layer {
                Some(layer) if layer.is_dragging() => Ok(Location::Dragging { character: parent }),
                Some(layer) => Ok(Location::Layer { character: parent, layer }),
                None => Err(WorldError::Invariant(format!(
                    "{id} is held by {parent} without a layer"
                ))),
            },
        }
    }

    fn require_limbo(&self, id: ObjectId) -> Result<(), WorldError> {
        if self.item(id)?.is_limbo() {
            Ok(())
        } else {
            Err(WorldError::NotInLimbo(id))
        }
    }

    /// Removes an item from wherever it is. Weight is taken off every
    /// ancestor; nothing is announced until the item is attached again.
    pub fn detach_to_limbo(&mut self, id: ObjectId) -> Result<Location, WorldError> {
        let location = self.location_of(id)?;
        let weight = self.item(id)?.total_weight();
        match location {
            Location::Limbo => return Err(WorldError::AlreadyInLimbo(id)),
            Location::Ground(point) => self.unindex_ground(id, point),
            Location::Container { container, .. } => {
                self.unlink(ListOwner::Container(container), id)?;
            }
            Location::Layer { character, layer } => {
                self.unlink(ListOwner::Character(character, layer.group()), id)?;
            }
            Location::Dragging { character } => {
                self.character_mut(character)?.dragging = None;
            }
        }
        if let Some(parent) = location.parent() {
            self.adjust_weight(parent, -(weight as i64))?;
        }
        let item = self.item_mut(id)?;
        item.parent = None;
        item.layer = None;
        item.point = Point4D::LIMBO;
        if item.detached_from.is_none() {
            item.detached_from = Some(location);
        }
        trace!(item = %id, from = ?location, "detached");
        Ok(location)
    }

    pub fn attach_to(&mut self, id: ObjectId, location: Location) -> Result<(), WorldError> {
        match location {
            Location::Limbo => Err(WorldError::Invariant(format!(
                "{id} cannot be attached to limbo"
            ))),
            Location::Ground(point) => self.attach_to_ground(id, point),
            Location::Container { container, x, y } => self.attach_to_container(id, container, x, y),
            Location::Layer { character, layer } => {
                self.attach_to_character_layer(id, character, layer)
            }
            Location::Dragging { character } => self.attach_to_dragging(id, character),
        }
    }

    pub fn attach_to_ground(&mut self, id: ObjectId, point: Point4D) -> Result<(), WorldError> {
        self.require_limbo(id)?;
        if !self.map.is_valid_point(point) {
            return Err(WorldError::InvalidPosition(point));
        }
        self.item_mut(id)?.point = point;
        self.index_ground(id, point);
        self.finish_attach(id, Location::Ground(point))
    }

    pub fn attach_to_container(
        &mut self,
        id: ObjectId,
        container: ObjectId,
        x: u16,
        y: u16,
    ) -> Result<(), WorldError> {
        self.require_limbo(id)?;
        if !self.is_container(container)? {
            return Err(WorldError::NotAContainer(container));
        }
        if self.is_within(container, id)? {
            return Err(WorldError::Invariant(format!("{id} cannot contain itself")));
        }
        let (x, y) = clamp_container_xy(x, y);
        self.link_back(ListOwner::Container(container), id)?;
        let weight = {
            let item = self.item_mut(id)?;
            item.parent = Some(container);
            item.point = Point4D::new(x, y, 0, 0);
            item.total_weight()
        };
        self.adjust_weight(container, weight as i64)?;
        self.finish_attach(id, Location::Container { container, x, y })
    }

    /// Equips onto a layer. Whatever already occupies a conflicting slot
    /// is dropped at the character's feet first; the special layer never
    /// conflicts.
    pub fn attach_to_character_layer(
        &mut self,
        id: ObjectId,
        character: ObjectId,
        layer: Layer,
    ) -> Result<(), WorldError> {
        self.require_limbo(id)?;
        if !layer.is_valid() || layer.is_dragging() {
            return Err(WorldError::InvalidLayer { item: id, layer: layer.0 });
        }
        self.character(character)?;
        let two_handed = self.def_of(id)?.two_handed;
        for occupant in self.conflicting_occupants(character, layer, two_handed)? {
            self.evict_to_ground(occupant, character)?;
        }
        self.link_back(ListOwner::Character(character, layer.group()), id)?;
        let weight = {
            let item = self.item_mut(id)?;
            item.parent = Some(character);
            item.layer = Some(layer);
            item.point = Point4D::ORIGIN;
            item.total_weight()
        };
        self.adjust_weight(character, weight as i64)?;
        self.finish_attach(id, Location::Layer { character, layer })
    }

    pub fn attach_to_dragging(&mut self, id: ObjectId, character: ObjectId) -> Result<(), WorldError> {
        self.require_limbo(id)?;
        if let Some(held) = self.character(character)?.dragging {
            return Err(WorldError::Invariant(format!(
                "{character} is already dragging {held}"
            )));
        }
        self.character_mut(character)?.dragging = Some(id);
        let weight = {
            let item = self.item_mut(id)?;
            item.parent = Some(character);
            item.layer = Some(Layer::DRAGGING);
            item.point = Point4D::ORIGIN;
            item.total_weight()
        };
        self.adjust_weight(character, weight as i64)?;
        self.finish_attach(id, Location::Dragging { character })
    }

    fn finish_attach(&mut self, id: ObjectId, new: Location) -> Result<(), WorldError> {
        let old = self.item_mut(id)?.detached_from.take().unwrap_or(Location::Limbo);
        trace!(item = %id, ?old, ?new, "attached");
        self.events.push(WorldEvent::ContainmentChanged { item: id, old, new });
        Ok(())
    }

    fn evict_to_ground(&mut self, occupant: ObjectId, character: ObjectId) -> Result<(), WorldError> {
        let point = self.character(character)?.point;
        debug!(item = %occupant, %character, %point, "evicting equipped item to the ground");
        self.detach_to_limbo(occupant)?;
        self.attach_to_ground(occupant, point)
    }

    /// Adds `delta` to the contained weight of `start` and every holder
    /// above it, up to and including a character.
    pub(crate) fn adjust_weight(&mut self, start: ObjectId, delta: i64) -> Result<(), WorldError> {
        if delta == 0 {
            return Ok(());
        }
        let mut current = Some(start);
        while let Some(id) = current {
            let missing = self.object(id).err();
            current = match self.objects.resolve_mut(id) {
                Some(WorldObject::Item(item)) => {
                    item.contained_weight = apply_delta(item.contained_weight, delta);
                    item.parent
                }
                Some(WorldObject::Character(character)) => {
                    character.contained_weight = apply_delta(character.contained_weight, delta);
                    None
                }
                None => return Err(missing.unwrap_or(WorldError::Unknown(id))),
            };
        }
        Ok(())
    }

    /// Raw occupant of exactly this layer.
    pub(crate) fn layer_occupant(
        &self,
        character: ObjectId,
        layer: Layer,
    ) -> Result<Option<ObjectId>, WorldError> {
        let holder = self.character(character)?;
        if layer.is_dragging() {
            return Ok(holder.dragging);
        }
        let list = holder.group(layer.group());
        Ok(self
            .list_ids(list)
            .into_iter()
            .find(|id| self.item(*id).map(|item| item.layer == Some(layer)).unwrap_or(false)))
    }

    /// Item filling a layer. A two-handed item in either hand also fills
    /// the other one.
    pub fn find_layer(&self, character: ObjectId, layer: Layer) -> Result<Option<ObjectId>, WorldError> {
        if let Some(found) = self.layer_occupant(character, layer)? {
            return Ok(Some(found));
        }
        if let Some(other) = layer.opposite_hand() {
            if let Some(found) = self.layer_occupant(character, other)? {
                if self.def_of(found)?.two_handed {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    pub fn backpack(&self, character: ObjectId) -> Result<Option<ObjectId>, WorldError> {
        self.layer_occupant(character, Layer::BACKPACK)
    }

    /// Items that must leave before something goes onto `layer`.
    pub(crate) fn conflicting_occupants(
        &self,
        character: ObjectId,
        layer: Layer,
        incoming_two_handed: bool,
    ) -> Result<Vec<ObjectId>, WorldError> {
        if layer.is_special() || layer.is_dragging() {
            return Ok(Vec::new());
        }
        if !layer.is_hand() {
            return Ok(self.layer_occupant(character, layer)?.into_iter().collect());
        }
        let mut conflicts = Vec::new();
        for hand in [Layer::HAND1, Layer::HAND2] {
            if let Some(occupant) = self.layer_occupant(character, hand)? {
                if incoming_two_handed || hand == layer || self.def_of(occupant)?.two_handed {
                    conflicts.push(occupant);
                }
            }
        }
        Ok(conflicts)
    }

    pub fn contents(&self, container: ObjectId) -> Result<Vec<ObjectId>, WorldError> {
        let item = self.item(container)?;
        Ok(item.contents.map(|list| self.list_ids(list)).unwrap_or_default())
    }

    /// Everything a character holds: visible layers, the dragged item,
    /// the special layer, then invisible layers.
    pub fn inventory(&self, character: ObjectId) -> Result<Vec<ObjectId>, WorldError> {
        let holder = self.character(character)?;
        let mut ids = self.list_ids(holder.group(LayerGroup::Visible));
        ids.extend(holder.dragging);
        ids.extend(self.list_ids(holder.group(LayerGroup::Special)));
        ids.extend(self.list_ids(holder.group(LayerGroup::Invisible)));
        Ok(ids)
    }

    pub fn could_be_stacked(&self, a: ObjectId, b: ObjectId) -> Result<bool, WorldError> {
        let (first, second) = (self.item(a)?, self.item(b)?);
        if first.def != second.def || first.color != second.color || first.model != second.model {
            return Ok(false);
        }
        Ok(self.defs.require(first.def)?.stackable)
    }

    fn share_stack_spot(&self, a: ObjectId, b: ObjectId) -> Result<bool, WorldError> {
        let (first, second) = (self.item(a)?, self.item(b)?);
        match (first.parent, second.parent) {
            (Some(p), Some(q)) => Ok(p == q && self.is_container(p)?),
            (None, None) => Ok(first.is_on_ground()
                && second.is_on_ground()
                && first.point.same_tile(second.point)),
            _ => Ok(false),
        }
    }

    /// Amount a merge of the two would produce, if they can merge at all.
    pub(crate) fn merged_amount(
        &self,
        moving: ObjectId,
        stationary: ObjectId,
    ) -> Result<Option<u32>, WorldError> {
        if moving == stationary
            || !self.could_be_stacked(moving, stationary)?
            || !self.share_stack_spot(moving, stationary)?
        {
            return Ok(None);
        }
        let added = self.item(moving)?.amount;
        Ok(self.item(stationary)?.amount.checked_add(added))
    }

    /// Folds `moving` into `stationary` when both are compatible stacks in
    /// the same container (or on the same tile) and the sum fits. On
    /// success `moving` is deleted.
    pub fn try_merge(&mut self, moving: ObjectId, stationary: ObjectId) -> Result<bool, WorldError> {
        let Some(total) = self.merged_amount(moving, stationary)? else {
            return Ok(false);
        };
        self.delete(moving)?;
        self.set_amount(stationary, total)?;
        debug!(%moving, %stationary, total, "stacks merged");
        Ok(true)
    }
}

fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, BAG, GOLD, HALBERD, RING, SHIELD, SWORD};

    #[test]
    fn only_limbo_items_can_be_attached() {
        let mut fx = fixture();
        let point = Point4D::new(60, 60, 0, 0);
        let sword = fx.world.create_item(SWORD, 1, Location::Ground(point)).expect("sword");
        assert_eq!(fx.world.attach_to_ground(sword, point), Err(WorldError::NotInLimbo(sword)));
        assert_eq!(fx.world.detach_to_limbo(sword), Ok(Location::Ground(point)));
        assert_eq!(fx.world.detach_to_limbo(sword), Err(WorldError::AlreadyInLimbo(sword)));
        fx.world.attach_to_ground(sword, point).expect("reattach");
        assert!(fx.world.check_invariants().is_empty());
    }

    #[test]
    fn container_keeps_insertion_order_across_removal() {
        let mut fx = fixture();
        let bag = fx
            .world
            .create_item(BAG, 1, Location::Ground(Point4D::new(60, 60, 0, 0)))
            .expect("bag");
        let ids: Vec<ObjectId> = (0..4)
            .map(|_| {
                fx.world
                    .create_item(SWORD, 1, Location::Container { container: bag, x: 1, y: 500 })
                    .expect("sword")
            })
            .collect();
        assert_eq!(
            fx.world.location_of(ids[0]),
            Ok(Location::Container { container: bag, x: CONTAINER_MIN_XY, y: CONTAINER_MAX_XY })
        );
        fx.world.detach_to_limbo(ids[1]).expect("detach");
        assert_eq!(fx.world.contents(bag).expect("contents"), vec![ids[0], ids[2], ids[3]]);
        fx.world.attach_to_container(ids[1], bag, 30, 30).expect("attach");
        assert_eq!(
            fx.world.contents(bag).expect("contents"),
            vec![ids[0], ids[2], ids[3], ids[1]]
        );
        assert_eq!(fx.world.item(bag).expect("bag").child_count(), 4);
    }

    #[test]
    fn weight_propagates_through_nested_containers() {
        let mut fx = fixture();
        let base = fx.world.character(fx.alice).expect("alice").contained_weight();
        let bag = fx
            .world
            .create_item(BAG, 1, Location::Container { container: fx.backpack, x: 40, y: 40 })
            .expect("bag");
        let gold = fx
            .world
            .create_item(GOLD, 7, Location::Container { container: bag, x: 40, y: 40 })
            .expect("gold");
        let bag_weight = fx.world.item(bag).expect("bag").own_weight();
        let gold_weight = fx.world.item(gold).expect("gold").own_weight();
        assert_eq!(fx.world.item(bag).expect("bag").contained_weight(), gold_weight);
        assert_eq!(
            fx.world.character(fx.alice).expect("alice").contained_weight(),
            base + bag_weight + gold_weight
        );
        fx.world.detach_to_limbo(gold).expect("detach");
        assert_eq!(
            fx.world.character(fx.alice).expect("alice").contained_weight(),
            base + bag_weight
        );
        fx.world.delete(gold).expect("delete");
        assert!(fx.world.check_invariants().is_empty());
    }

    #[test]
    fn non_containers_and_cycles_are_rejected() {
        let mut fx = fixture();
        let point = Point4D::new(60, 60, 0, 0);
        let sword = fx.world.create_item(SWORD, 1, Location::Ground(point)).expect("sword");
        let outer = fx.world.create_item(BAG, 1, Location::Ground(point)).expect("outer");
        let inner = fx
            .world
            .create_item(BAG, 1, Location::Container { container: outer, x: 30, y: 30 })
            .expect("inner");
        let gold = fx.world.create_item(GOLD, 1, Location::Ground(point)).expect("gold");
        fx.world.detach_to_limbo(gold).expect("detach");
        assert_eq!(
            fx.world.attach_to_container(gold, sword, 30, 30),
            Err(WorldError::NotAContainer(sword))
        );
        fx.world.detach_to_limbo(outer).expect("detach outer");
        assert!(matches!(
            fx.world.attach_to_container(outer, inner, 30, 30),
            Err(WorldError::Invariant(_))
        ));
    }

    #[test]
    fn occupied_layer_is_evicted_to_the_ground() {
        let mut fx = fixture();
        let feet = fx.world.character(fx.alice).expect("alice").point();
        let first = fx
            .world
            .create_item(RING, 1, Location::Layer { character: fx.alice, layer: Layer::RING })
            .expect("first");
        let second = fx
            .world
            .create_item(RING, 1, Location::Layer { character: fx.alice, layer: Layer::RING })
            .expect("second");
        assert_eq!(fx.world.location_of(first), Ok(Location::Ground(feet)));
        assert_eq!(fx.world.find_layer(fx.alice, Layer::RING), Ok(Some(second)));
        assert!(fx.world.check_invariants().is_empty());
    }

    #[test]
    fn two_handed_items_fill_both_hands() {
        let mut fx = fixture();
        let shield = fx
            .world
            .create_item(SHIELD, 1, Location::Layer { character: fx.alice, layer: Layer::HAND2 })
            .expect("shield");
        let sword = fx
            .world
            .create_item(SWORD, 1, Location::Layer { character: fx.alice, layer: Layer::HAND1 })
            .expect("sword");
        assert_eq!(fx.world.find_layer(fx.alice, Layer::HAND2), Ok(Some(shield)));
        let halberd = fx
            .world
            .create_item(HALBERD, 1, Location::Layer { character: fx.alice, layer: Layer::HAND1 })
            .expect("halberd");
        assert!(matches!(fx.world.location_of(shield), Ok(Location::Ground(_))));
        assert!(matches!(fx.world.location_of(sword), Ok(Location::Ground(_))));
        assert_eq!(fx.world.find_layer(fx.alice, Layer::HAND1), Ok(Some(halberd)));
        assert_eq!(fx.world.find_layer(fx.alice, Layer::HAND2), Ok(Some(halberd)));
        assert_eq!(
            fx.world.conflicting_occupants(fx.alice, Layer::HAND2, false),
            Ok(vec![halberd])
        );
    }

    #[test]
    fn special_layer_holds_many_and_never_evicts() {
        let mut fx = fixture();
        let a = fx
            .world
            .create_item(RING, 1, Location::Layer { character: fx.alice, layer: Layer::SPECIAL })
            .expect("a");
        let b = fx
            .world
            .create_item(RING, 1, Location::Layer { character: fx.alice, layer: Layer::SPECIAL })
            .expect("b");
        let inventory = fx.world.inventory(fx.alice).expect("inventory");
        assert!(inventory.contains(&a) && inventory.contains(&b));
        assert_eq!(fx.world.location_of(a), Ok(Location::Layer { character: fx.alice, layer: Layer::SPECIAL }));
    }

    #[test]
    fn inventory_lists_groups_in_order() {
        let mut fx = fixture();
        let hidden = fx
            .world
            .create_item(RING, 1, Location::Layer { character: fx.alice, layer: Layer::BANK_BOX })
            .expect("hidden");
        let special = fx
            .world
            .create_item(RING, 1, Location::Layer { character: fx.alice, layer: Layer::SPECIAL })
            .expect("special");
        let held = fx
            .world
            .create_item(GOLD, 1, Location::Dragging { character: fx.alice })
            .expect("held");
        assert_eq!(
            fx.world.inventory(fx.alice).expect("inventory"),
            vec![fx.backpack, held, special, hidden]
        );
        assert!(matches!(
            fx.world.create_item(GOLD, 1, Location::Dragging { character: fx.alice }),
            Err(WorldError::Invariant(_))
        ));
        assert_eq!(
            fx.world.attach_to(held, Location::Layer { character: fx.alice, layer: Layer::DRAGGING }),
            Err(WorldError::NotInLimbo(held))
        );
    }

    #[test]
    fn merge_requires_matching_stacks_in_one_place() {
        let mut fx = fixture();
        let bag = fx.backpack;
        let spot = |x| Location::Container { container: bag, x, y: 30 };
        let a = fx.world.create_item(GOLD, 5, spot(30)).expect("a");
        let b = fx.world.create_item(GOLD, 3, spot(40)).expect("b");
        let tinted = fx.world.create_item(GOLD, 3, spot(50)).expect("tinted");
        fx.world.set_item_color(tinted, 0x0481).expect("color");
        let elsewhere = fx
            .world
            .create_item(GOLD, 3, Location::Ground(Point4D::new(60, 60, 0, 0)))
            .expect("elsewhere");

        assert_eq!(fx.world.try_merge(a, tinted), Ok(false));
        assert_eq!(fx.world.try_merge(a, elsewhere), Ok(false));
        assert_eq!(fx.world.try_merge(a, a), Ok(false));
        assert_eq!(fx.world.try_merge(a, b), Ok(true));
        assert_eq!(fx.world.item(b).expect("b").amount(), 8);
        assert_eq!(fx.world.object(a).map(|_| ()), Err(WorldError::Deleted(a)));

        fx.world.set_amount(b, u32::MAX).expect("amount");
        assert_eq!(fx.world.try_merge(tinted, b), Ok(false));
        fx.world.set_item_color(tinted, 0).expect("color");
        assert_eq!(fx.world.try_merge(tinted, b), Ok(false));
        assert_eq!(fx.world.item(tinted).expect("tinted").amount(), 3);
        assert!(fx.world.check_invariants().is_empty());
    }
}
