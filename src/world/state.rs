use crate::config::{Rules, WorldConfig};
use crate::entities::character::Character;
use crate::entities::defs::{DefId, DefIndex, DefKind, ThingDef};
use crate::entities::ids::{IdentityRegistry, ObjectId};
use crate::entities::item::{Item, ItemFlags};
use crate::entities::object::WorldObject;
use crate::error::WorldError;
use crate::scripting::hooks::{HandlerRegistry, Hook, HookArgs, NoHandlers, Participant};
use crate::world::containment::Location;
use crate::world::events::{EventQueue, WorldEvent};
use crate::world::map::{GridMap, MapService};
use crate::world::position::Point4D;
use crate::world::time::GameClock;
use crate::world::tracker::RegionCache;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info};

pub(crate) type TileKey = (u16, u16, u8);

pub(crate) fn tile_key(point: Point4D) -> TileKey {
    (point.x, point.y, point.m)
}

/// Deterministic generator for drop coordinates inside containers.
#[derive(Debug, Clone)]
pub struct PlacementRng {
    state: u64,
}

impl PlacementRng {
    pub fn from_seed(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state: seed }
    }

    pub fn roll_range(&mut self, min: u16, max: u16) -> u16 {
        let (min, max) = if min >= max { (min, min) } else { (min, max) };
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        let span = u64::from(max - min) + 1;
        let value = (self.state >> 32) % span;
        min + value as u16
    }
}

/// The whole mutable object graph plus the services it consults.
pub struct World {
    pub(crate) objects: IdentityRegistry<WorldObject>,
    pub(crate) defs: DefIndex,
    pub(crate) map: Box<dyn MapService>,
    pub(crate) regions: RegionCache,
    pub(crate) handlers: Rc<dyn HandlerRegistry>,
    pub(crate) events: EventQueue,
    pub(crate) ground: HashMap<TileKey, Vec<ObjectId>>,
    pub(crate) clock: GameClock,
    pub(crate) rules: Rules,
    pub(crate) rng: PlacementRng,
    pub(crate) in_flight: u32,
}

impl World {
    pub fn new(defs: DefIndex, map: Box<dyn MapService>, rules: Rules) -> Self {
        Self {
            objects: IdentityRegistry::new(),
            defs,
            map,
            regions: RegionCache::new(rules.region_cache_capacity),
            handlers: Rc::new(NoHandlers),
            events: EventQueue::default(),
            ground: HashMap::new(),
            clock: GameClock::default(),
            rules,
            rng: PlacementRng::from_seed(rules.placement_seed),
            in_flight: 0,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Result<Self, WorldError> {
        let defs = DefIndex::try_from(config.defs.clone())?;
        let map = GridMap::from_config(&config.map);
        info!(
            defs = defs.len(),
            regions = map.regions().len(),
            width = config.map.width,
            height = config.map.height,
            "world created"
        );
        Ok(Self::new(defs, Box::new(map), config.rules()))
    }

    pub fn set_handlers(&mut self, handlers: Rc<dyn HandlerRegistry>) {
        self.handlers = handlers;
    }

    pub fn handlers(&self) -> Rc<dyn HandlerRegistry> {
        Rc::clone(&self.handlers)
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn defs(&self) -> &DefIndex {
        &self.defs
    }

    pub fn map(&self) -> &dyn MapService {
        self.map.as_ref()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.ids()
    }

    fn missing(&self, id: ObjectId) -> WorldError {
        if self.objects.is_released(id) {
            WorldError::Deleted(id)
        } else {
            WorldError::Unknown(id)
        }
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.objects.resolve(id).is_some()
    }

    pub fn object(&self, id: ObjectId) -> Result<&WorldObject, WorldError> {
        self.objects.resolve(id).ok_or_else(|| self.missing(id))
    }

    pub fn item(&self, id: ObjectId) -> Result<&Item, WorldError> {
        match self.object(id)? {
            WorldObject::Item(item) => Ok(item),
            WorldObject::Character(_) => Err(WorldError::NotAnItem(id)),
        }
    }

    pub fn character(&self, id: ObjectId) -> Result<&Character, WorldError> {
        match self.object(id)? {
            WorldObject::Character(character) => Ok(character),
            WorldObject::Item(_) => Err(WorldError::NotACharacter(id)),
        }
    }

    pub(crate) fn item_mut(&mut self, id: ObjectId) -> Result<&mut Item, WorldError> {
        let missing = self.missing(id);
        match self.objects.resolve_mut(id) {
            Some(WorldObject::Item(item)) => Ok(item),
            Some(WorldObject::Character(_)) => Err(WorldError::NotAnItem(id)),
            None => Err(missing),
        }
    }

    /// Mutable access for settings that do not affect placement
    /// (privilege, movement caps, mount state).
    pub fn character_mut(&mut self, id: ObjectId) -> Result<&mut Character, WorldError> {
        let missing = self.missing(id);
        match self.objects.resolve_mut(id) {
            Some(WorldObject::Character(character)) => Ok(character),
            Some(WorldObject::Item(_)) => Err(WorldError::NotACharacter(id)),
            None => Err(missing),
        }
    }

    pub fn def_of(&self, id: ObjectId) -> Result<&ThingDef, WorldError> {
        let def = self.object(id)?.def();
        self.defs.require(def)
    }

    pub fn is_container(&self, id: ObjectId) -> Result<bool, WorldError> {
        match self.object(id)? {
            WorldObject::Item(item) => Ok(self.defs.require(item.def)?.container),
            WorldObject::Character(_) => Ok(false),
        }
    }

    pub fn create_item(
        &mut self,
        def: DefId,
        amount: u32,
        at: Location,
    ) -> Result<ObjectId, WorldError> {
        let template = self.defs.require(def)?.clone();
        if template.kind != DefKind::Item {
            return Err(WorldError::WrongDefKind(def));
        }
        if amount == 0 {
            return Err(WorldError::ZeroAmount(self.objects.peek_next()));
        }
        let created_at = self.clock.now().0;
        let id = self.objects.allocate_with(|id| {
            let mut item = Item::new(id, &template, created_at);
            item.amount = amount;
            WorldObject::Item(item)
        });
        self.events.push(WorldEvent::Created { entity: id });
        if let Err(err) = self.attach_to(id, at) {
            self.events.retract(&WorldEvent::Created { entity: id });
            self.objects.release(id);
            return Err(err);
        }
        debug!(item = %id, def = template.id.0, amount, location = ?at, "item created");
        self.notify_created(id);
        Ok(id)
    }

    pub fn create_character(
        &mut self,
        def: DefId,
        name: &str,
        point: Point4D,
    ) -> Result<ObjectId, WorldError> {
        let template = self.defs.require(def)?.clone();
        if template.kind != DefKind::Character {
            return Err(WorldError::WrongDefKind(def));
        }
        if !self.map.is_valid_point(point) {
            return Err(WorldError::InvalidPosition(point));
        }
        let created_at = self.clock.now().0;
        let id = self.objects.allocate_with(|id| {
            WorldObject::Character(Character::new(id, &template, name, point, created_at))
        });
        self.events.push(WorldEvent::Created { entity: id });
        debug!(character = %id, name, %point, "character created");
        self.notify_created(id);
        Ok(id)
    }

    fn notify_created(&mut self, id: ObjectId) {
        self.notify(Hook::Create, Participant::Object(id), &HookArgs::subject(id), None);
    }

    /// Destroys an object and everything it holds, children first.
    pub fn delete(&mut self, id: ObjectId) -> Result<(), WorldError> {
        let children = match self.object(id)? {
            WorldObject::Item(_) => self.contents(id)?,
            WorldObject::Character(_) => self.inventory(id)?,
        };
        self.notify(Hook::Destroy, Participant::Object(id), &HookArgs::subject(id), None);
        for child in children {
            if self.exists(child) {
                self.delete(child)?;
            }
        }
        // a destroy handler may already have removed it
        if !self.exists(id) {
            return Ok(());
        }
        let placed = self.item(id).map(|item| !item.is_limbo()).unwrap_or(false);
        if placed {
            self.detach_to_limbo(id)?;
        }
        self.objects.release(id);
        self.events.push(WorldEvent::Deleted { entity: id });
        debug!(entity = %id, "deleted");
        Ok(())
    }

    pub fn set_amount(&mut self, id: ObjectId, amount: u32) -> Result<(), WorldError> {
        if amount == 0 {
            return Err(WorldError::ZeroAmount(id));
        }
        let (old, unit, parent) = {
            let item = self.item(id)?;
            (item.amount, item.unit_weight, item.parent)
        };
        if old == amount {
            return Ok(());
        }
        self.item_mut(id)?.amount = amount;
        if let Some(parent) = parent {
            let delta = i64::from(unit) * (i64::from(amount) - i64::from(old));
            self.adjust_weight(parent, delta)?;
        }
        self.events.push(WorldEvent::AmountChanged { item: id, old, new: amount });
        Ok(())
    }

    pub fn set_item_color(&mut self, id: ObjectId, color: u16) -> Result<(), WorldError> {
        self.item_mut(id)?.color = color;
        self.events.push(WorldEvent::FieldChanged { entity: id, field: "color" });
        Ok(())
    }

    pub fn set_item_model(&mut self, id: ObjectId, model: u16) -> Result<(), WorldError> {
        self.item_mut(id)?.model = model;
        self.events.push(WorldEvent::FieldChanged { entity: id, field: "model" });
        Ok(())
    }

    pub fn set_item_name(&mut self, id: ObjectId, name: Option<String>) -> Result<(), WorldError> {
        self.item_mut(id)?.name = name;
        self.events.push(WorldEvent::FieldChanged { entity: id, field: "name" });
        Ok(())
    }

    pub fn set_item_flags(&mut self, id: ObjectId, flags: ItemFlags) -> Result<(), WorldError> {
        self.item_mut(id)?.flags = flags;
        self.events.push(WorldEvent::FieldChanged { entity: id, field: "flags" });
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn allocate_transient_id(&mut self) -> ObjectId {
        self.objects.allocate_transient()
    }

    pub fn release_transient_id(&mut self, id: ObjectId) -> bool {
        self.objects.release_transient(id)
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub(crate) fn begin_action(&mut self) {
        self.in_flight += 1;
    }

    pub(crate) fn end_action(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Renumbers every live object densely and rewrites all stored
    /// references. Refused while any action is running.
    pub fn compact_ids(&mut self) -> Result<HashMap<ObjectId, ObjectId>, WorldError> {
        if self.in_flight > 0 {
            return Err(WorldError::CompactionInFlight(self.in_flight));
        }
        let remap = self.objects.compact();
        if remap.is_empty() {
            return Ok(remap);
        }
        let map_id = |id: ObjectId| remap.get(&id).copied().unwrap_or(id);
        let map_opt = |id: Option<ObjectId>| id.map(map_id);
        for (new_id, object) in self.objects.iter_mut() {
            match object {
                WorldObject::Item(item) => {
                    item.id = new_id;
                    item.parent = map_opt(item.parent);
                    item.links.prev = map_opt(item.links.prev);
                    item.links.next = map_opt(item.links.next);
                    if let Some(list) = item.contents.as_mut() {
                        list.head = map_opt(list.head);
                        list.tail = map_opt(list.tail);
                    }
                    item.detached_from = item.detached_from.map(|location| location.remap(&map_id));
                }
                WorldObject::Character(character) => {
                    character.id = new_id;
                    character.dragging = map_opt(character.dragging);
                    for list in [
                        &mut character.visible,
                        &mut character.invisible,
                        &mut character.special,
                    ] {
                        list.head = map_opt(list.head);
                        list.tail = map_opt(list.tail);
                    }
                }
            }
        }
        for ids in self.ground.values_mut() {
            for id in ids.iter_mut() {
                *id = map_id(*id);
            }
        }
        info!(renumbered = remap.len(), live = self.objects.len(), "identifiers compacted");
        Ok(remap)
    }

    pub(crate) fn index_ground(&mut self, id: ObjectId, point: Point4D) {
        self.ground.entry(tile_key(point)).or_default().push(id);
    }

    pub(crate) fn unindex_ground(&mut self, id: ObjectId, point: Point4D) {
        let key = tile_key(point);
        if let Some(ids) = self.ground.get_mut(&key) {
            ids.retain(|entry| *entry != id);
            if ids.is_empty() {
                self.ground.remove(&key);
            }
        }
    }

    /// Ground items on one tile, in drop order.
    pub fn items_at(&self, point: Point4D) -> Vec<ObjectId> {
        self.ground.get(&tile_key(point)).cloned().unwrap_or_default()
    }

    pub fn nearby_items(&self, center: Point4D, radius: u16) -> Vec<ObjectId> {
        let mut found = Vec::new();
        let x_range = center.x.saturating_sub(radius)..=center.x.saturating_add(radius);
        let y_range = center.y.saturating_sub(radius)..=center.y.saturating_add(radius);
        for y in y_range {
            for x in x_range.clone() {
                if let Some(ids) = self.ground.get(&(x, y, center.m)) {
                    found.extend(ids.iter().copied());
                }
            }
        }
        found
    }

    pub fn nearby_characters(&self, center: Point4D, radius: u16) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter_map(|(id, object)| object.as_character().map(|character| (id, character)))
            .filter(|(_, character)| {
                character.point.m == center.m && character.point.distance(center) <= radius
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Outermost holder of an object and the map point it sits at.
    pub fn top_level(&self, id: ObjectId) -> Result<(ObjectId, Point4D), WorldError> {
        let mut current = id;
        // parent chains are acyclic; the bound only guards corruption
        for _ in 0..=self.objects.len() {
            match self.object(current)? {
                WorldObject::Character(character) => return Ok((current, character.point)),
                WorldObject::Item(item) => match item.parent {
                    Some(parent) => current = parent,
                    None => return Ok((current, item.point)),
                },
            }
        }
        Err(WorldError::Invariant(format!("parent chain of {id} does not terminate")))
    }

    pub fn top_point(&self, id: ObjectId) -> Result<Point4D, WorldError> {
        self.top_level(id).map(|(_, point)| point)
    }

    /// True when `ancestor` appears on `id`'s parent chain (or is `id`).
    pub fn is_within(&self, id: ObjectId, ancestor: ObjectId) -> Result<bool, WorldError> {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(cursor) = current {
            if cursor == ancestor {
                return Ok(true);
            }
            steps += 1;
            if steps > self.objects.len() + 1 {
                return Err(WorldError::Invariant(format!(
                    "parent chain of {id} does not terminate"
                )));
            }
            current = match self.object(cursor)? {
                WorldObject::Item(item) => item.parent,
                WorldObject::Character(_) => None,
            };
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, BAG, GOLD, HUMAN, SWORD};

    #[test]
    fn created_items_are_placed_and_announced() {
        let mut fx = fixture();
        let world = &mut fx.world;
        let point = Point4D::new(30, 30, 0, 0);
        let gold = world
            .create_item(GOLD, 5, Location::Ground(point))
            .expect("create");
        let events = world.drain_events();
        assert_eq!(events[0], WorldEvent::Created { entity: gold });
        assert!(matches!(
            events[1],
            WorldEvent::ContainmentChanged { new: Location::Ground(p), .. } if p == point
        ));
        assert_eq!(world.items_at(point), vec![gold]);
        assert_eq!(world.item(gold).expect("gold").amount(), 5);
    }

    #[test]
    fn factories_check_template_kind() {
        let mut fx = fixture();
        let point = Point4D::new(30, 30, 0, 0);
        assert_eq!(
            fx.world.create_item(HUMAN, 1, Location::Ground(point)),
            Err(WorldError::WrongDefKind(HUMAN))
        );
        assert_eq!(
            fx.world.create_character(SWORD, "sword", point),
            Err(WorldError::WrongDefKind(SWORD))
        );
        assert_eq!(
            fx.world.create_item(DefId(999), 1, Location::Ground(point)),
            Err(WorldError::UnknownDef(DefId(999)))
        );
    }

    #[test]
    fn failed_placement_releases_the_new_id() {
        let mut fx = fixture();
        let before = fx.world.object_count();
        let err = fx
            .world
            .create_item(GOLD, 1, Location::Ground(Point4D::new(5000, 5, 0, 0)))
            .expect_err("off map");
        assert!(matches!(err, WorldError::InvalidPosition(_)));
        assert_eq!(fx.world.object_count(), before);
        assert_eq!(fx.world.pending_events(), 0);
    }

    #[test]
    fn delete_cascades_children_before_the_container() {
        let mut fx = fixture();
        let world = &mut fx.world;
        let bag = world
            .create_item(BAG, 1, Location::Ground(Point4D::new(40, 40, 0, 0)))
            .expect("bag");
        let inside: Vec<ObjectId> = (0..3)
            .map(|n| {
                world
                    .create_item(SWORD, 1, Location::Container { container: bag, x: 20 + n, y: 20 })
                    .expect("sword")
            })
            .collect();
        world.drain_events();
        world.delete(bag).expect("delete");

        let deleted: Vec<ObjectId> = world
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                WorldEvent::Deleted { entity } => Some(entity),
                _ => None,
            })
            .collect();
        let mut expected = inside.clone();
        expected.push(bag);
        assert_eq!(deleted, expected);
        for id in expected {
            assert_eq!(world.object(id).map(|_| ()), Err(WorldError::Deleted(id)));
        }
        assert!(world.items_at(Point4D::new(40, 40, 0, 0)).is_empty());
    }

    #[test]
    fn amount_changes_adjust_ancestor_weight() {
        let mut fx = fixture();
        let backpack = fx.backpack;
        let gold = fx
            .world
            .create_item(GOLD, 10, Location::Container { container: backpack, x: 30, y: 30 })
            .expect("gold");
        let before = fx.world.character(fx.alice).expect("alice").contained_weight();
        fx.world.set_amount(gold, 25).expect("amount");
        let after = fx.world.character(fx.alice).expect("alice").contained_weight();
        assert_eq!(after - before, 15);
        assert_eq!(fx.world.set_amount(gold, 0), Err(WorldError::ZeroAmount(gold)));
        assert!(fx.world.check_invariants().is_empty());
    }

    #[test]
    fn compaction_rewrites_references() {
        let mut fx = fixture();
        let world = &mut fx.world;
        let spare = world
            .create_item(SWORD, 1, Location::Ground(Point4D::new(50, 50, 0, 0)))
            .expect("spare");
        let bag = world
            .create_item(BAG, 1, Location::Ground(Point4D::new(51, 50, 0, 0)))
            .expect("bag");
        let coin = world
            .create_item(GOLD, 3, Location::Container { container: bag, x: 25, y: 25 })
            .expect("coin");
        world.delete(spare).expect("delete");

        let remap = world.compact_ids().expect("compact");
        let bag = remap.get(&bag).copied().unwrap_or(bag);
        let coin = remap.get(&coin).copied().unwrap_or(coin);
        assert_eq!(world.item(coin).expect("coin").parent(), Some(bag));
        assert_eq!(world.contents(bag).expect("contents"), vec![coin]);
        assert_eq!(world.items_at(Point4D::new(51, 50, 0, 0)), vec![bag]);
        assert!(world.check_invariants().is_empty());
    }

    #[test]
    fn compaction_is_refused_mid_action() {
        let mut fx = fixture();
        fx.world.begin_action();
        assert_eq!(fx.world.compact_ids(), Err(WorldError::CompactionInFlight(1)));
        fx.world.end_action();
        assert!(fx.world.compact_ids().is_ok());
    }

    #[test]
    fn transient_ids_never_resolve() {
        let mut fx = fixture();
        let preview = fx.world.allocate_transient_id();
        assert!(preview.is_transient());
        assert_eq!(fx.world.object(preview).map(|_| ()), Err(WorldError::Unknown(preview)));
        assert!(fx.world.release_transient_id(preview));
    }

    #[test]
    fn nearby_queries_scan_a_square() {
        let mut fx = fixture();
        let center = fx.world.character(fx.alice).expect("alice").point();
        let near = Point4D::new(center.x + 2, center.y + 1, 0, 0);
        let far = Point4D::new(center.x + 9, center.y, 0, 0);
        let a = fx.world.create_item(GOLD, 1, Location::Ground(near)).expect("near");
        fx.world.create_item(GOLD, 1, Location::Ground(far)).expect("far");
        assert_eq!(fx.world.nearby_items(center, 3), vec![a]);
        assert!(fx.world.nearby_characters(center, 0).contains(&fx.alice));
        assert!(fx.world.nearby_characters(center, 3).contains(&fx.bob));
    }

    #[test]
    fn placement_rng_stays_in_range() {
        let mut rng = PlacementRng::from_seed(0);
        for _ in 0..200 {
            let value = rng.roll_range(20, 120);
            assert!((20..=120).contains(&value));
        }
        assert_eq!(rng.roll_range(50, 10), 50);
    }
}
