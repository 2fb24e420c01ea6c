use crate::config::Rules;
use crate::entities::defs::{DefId, DefIndex, ThingDef};
use crate::entities::ids::ObjectId;
use crate::entities::layer::Layer;
use crate::scripting::hooks::{Flow, Hook};
use crate::scripting::registry::{Scope, TriggerRegistry};
use crate::world::containment::Location;
use crate::world::map::{GridMap, Terrain, TileInfo};
use crate::world::position::Point4D;
use crate::world::region::{RegionId, RegionMap, Zone};
use crate::world::state::World;
use std::cell::RefCell;
use std::rc::Rc;

pub const GOLD: DefId = DefId(1);
pub const BAG: DefId = DefId(2);
pub const BACKPACK: DefId = DefId(3);
pub const SWORD: DefId = DefId(4);
pub const SHIELD: DefId = DefId(5);
pub const HALBERD: DefId = DefId(6);
pub const RING: DefId = DefId(7);
pub const HUMAN: DefId = DefId(100);

/// The first zone of the fixture map, covering 0..=50 on plane 0.
pub const TOWN: RegionId = RegionId(1);
/// A wall right north of Alice.
pub const WALL: Point4D = Point4D::new(100, 99, 0, 0);

pub struct Fixture {
    pub world: World,
    pub alice: ObjectId,
    pub bob: ObjectId,
    pub backpack: ObjectId,
    pub bob_backpack: ObjectId,
}

pub fn defs() -> DefIndex {
    DefIndex::try_from(vec![
        ThingDef::item(GOLD.0, "gold coin", 3031, 1).stackable(),
        ThingDef::item(BAG.0, "bag", 2853, 8).container(),
        ThingDef::item(BACKPACK.0, "backpack", 2854, 18)
            .container()
            .worn_on(Layer::BACKPACK),
        ThingDef::item(SWORD.0, "sword", 3264, 35).worn_on(Layer::HAND1),
        ThingDef::item(SHIELD.0, "shield", 3412, 55).worn_on(Layer::HAND2),
        ThingDef::item(HALBERD.0, "halberd", 3269, 90)
            .worn_on(Layer::HAND1)
            .two_handed(),
        ThingDef::item(RING.0, "ring", 3007, 1).worn_on(Layer::RING),
        ThingDef::character(HUMAN.0, "human", 128),
    ])
    .expect("fixture defs")
}

pub fn rules() -> Rules {
    Rules {
        reach_range: 2,
        walk_step_ms: 180,
        mounted_step_ms: 90,
        region_cache_capacity: 64,
        placement_seed: 7,
    }
}

/// 1000x1000 single plane with a town in the corner and one wall tile.
pub fn map() -> GridMap {
    let mut map = GridMap::new(
        1000,
        1000,
        1,
        RegionMap::new(vec![Zone::new("town", 0, 0, 50, 50, 0)]),
    );
    map.set_tile(
        WALL.x,
        WALL.y,
        WALL.m,
        TileInfo {
            terrain: Terrain::Wall,
            z: None,
        },
    );
    map
}

/// Alice at (100,100) and Bob next to her, each wearing an empty backpack.
pub fn fixture() -> Fixture {
    let mut world = World::new(defs(), Box::new(map()), rules());
    let alice = world
        .create_character(HUMAN, "Alice", Point4D::new(100, 100, 0, 0))
        .expect("alice");
    let bob = world
        .create_character(HUMAN, "Bob", Point4D::new(101, 100, 0, 0))
        .expect("bob");
    let backpack = world
        .create_item(
            BACKPACK,
            1,
            Location::Layer {
                character: alice,
                layer: Layer::BACKPACK,
            },
        )
        .expect("alice backpack");
    let bob_backpack = world
        .create_item(
            BACKPACK,
            1,
            Location::Layer {
                character: bob,
                layer: Layer::BACKPACK,
            },
        )
        .expect("bob backpack");
    world.drain_events();
    Fixture {
        world,
        alice,
        bob,
        backpack,
        bob_backpack,
    }
}

pub type HookLog = Rc<RefCell<Vec<(Hook, Option<ObjectId>)>>>;

const DENY_HOOKS: [Hook; 20] = [
    Hook::DenyPickupItem,
    Hook::DenyPickup,
    Hook::DenyPickupItemFrom,
    Hook::DenyPutItemInItem,
    Hook::DenyPutInItem,
    Hook::DenyPutItemIn,
    Hook::DenyPutItemOnGround,
    Hook::DenyPutOnGround,
    Hook::DenyPutItemOnRegion,
    Hook::DenyEquipOnChar,
    Hook::DenyEquip,
    Hook::GiveItem,
    Hook::GivenTo,
    Hook::ReceiveItem,
    Hook::StackOnItem,
    Hook::ItemStackOn,
    Hook::Step,
    Hook::Turn,
    Hook::RegionExit,
    Hook::RegionEnter,
];

/// Registry that writes down every deny hook it is asked, with the
/// subject, and never objects.
pub fn recorder() -> (TriggerRegistry, HookLog) {
    let log: HookLog = Rc::new(RefCell::new(Vec::new()));
    let mut registry = TriggerRegistry::new();
    for hook in DENY_HOOKS {
        let log = Rc::clone(&log);
        registry.on_deny(hook, Scope::Any, move |_, args| {
            log.borrow_mut().push((hook, args.subject));
            Ok(Flow::Continue)
        });
    }
    (registry, log)
}
