use crate::actions::throttle::StepThrottle;
use crate::entities::defs::{DefId, ThingDef};
use crate::entities::ids::ObjectId;
use crate::entities::layer::LayerGroup;
use crate::world::child_list::ChildList;
use crate::world::position::{Direction, Point4D};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub u32);

pub const PRIVILEGE_PLAYER: u8 = 0;
pub const PRIVILEGE_GM: u8 = 4;

const DIRECTION_MASK: u8 = 0x07;
const FLAG_MOUNTED: u8 = 0x40;

/// Which terrain a character may enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementCaps {
    pub can_cross_land: bool,
    pub can_swim: bool,
    pub can_cross_lava: bool,
    pub can_fly: bool,
    pub ignore_doors: bool,
    /// Largest upward z change a single step may take.
    pub climb_power: i8,
}

impl Default for MovementCaps {
    fn default() -> Self {
        Self {
            can_cross_land: true,
            can_swim: false,
            can_cross_lava: false,
            can_fly: false,
            ignore_doors: false,
            climb_power: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Character {
    pub(crate) id: ObjectId,
    pub(crate) def: DefId,
    pub(crate) model: u16,
    pub(crate) color: u16,
    pub(crate) created_at: u64,
    pub(crate) name: String,
    pub(crate) account: Option<AccountId>,
    pub(crate) point: Point4D,
    pub(crate) dir_flags: u8,
    pub(crate) privilege: u8,
    pub(crate) caps: MovementCaps,
    pub(crate) visible: ChildList,
    pub(crate) invisible: ChildList,
    pub(crate) special: ChildList,
    pub(crate) dragging: Option<ObjectId>,
    pub(crate) contained_weight: u64,
    pub(crate) throttle: StepThrottle,
}

impl Character {
    pub(crate) fn new(
        id: ObjectId,
        def: &ThingDef,
        name: &str,
        point: Point4D,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            def: def.id,
            model: def.model,
            color: 0,
            created_at,
            name: name.to_string(),
            account: None,
            point,
            dir_flags: Direction::South.code(),
            privilege: PRIVILEGE_PLAYER,
            caps: MovementCaps::default(),
            visible: ChildList::default(),
            invisible: ChildList::default(),
            special: ChildList::default(),
            dragging: None,
            contained_weight: 0,
            throttle: StepThrottle::default(),
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account(&self) -> Option<AccountId> {
        self.account
    }

    pub fn point(&self) -> Point4D {
        self.point
    }

    pub fn direction(&self) -> Direction {
        Direction::from_code(self.dir_flags & DIRECTION_MASK).unwrap_or(Direction::North)
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.dir_flags = (self.dir_flags & !DIRECTION_MASK) | direction.code();
    }

    pub fn is_mounted(&self) -> bool {
        self.dir_flags & FLAG_MOUNTED != 0
    }

    pub fn set_mounted(&mut self, mounted: bool) {
        if mounted {
            self.dir_flags |= FLAG_MOUNTED;
        } else {
            self.dir_flags &= !FLAG_MOUNTED;
        }
    }

    pub fn privilege(&self) -> u8 {
        self.privilege
    }

    pub fn set_privilege(&mut self, privilege: u8) {
        self.privilege = privilege;
    }

    pub fn is_privileged(&self) -> bool {
        self.privilege >= PRIVILEGE_GM
    }

    pub fn caps(&self) -> MovementCaps {
        self.caps
    }

    pub fn set_caps(&mut self, caps: MovementCaps) {
        self.caps = caps;
    }

    pub fn dragging(&self) -> Option<ObjectId> {
        self.dragging
    }

    pub fn contained_weight(&self) -> u64 {
        self.contained_weight
    }

    pub fn throttle(&self) -> &StepThrottle {
        &self.throttle
    }

    pub(crate) fn group(&self, group: LayerGroup) -> ChildList {
        match group {
            LayerGroup::Visible => self.visible,
            LayerGroup::Invisible => self.invisible,
            LayerGroup::Special => self.special,
            LayerGroup::Dragging => ChildList::default(),
        }
    }

    pub(crate) fn group_mut(&mut self, group: LayerGroup) -> Option<&mut ChildList> {
        match group {
            LayerGroup::Visible => Some(&mut self.visible),
            LayerGroup::Invisible => Some(&mut self.invisible),
            LayerGroup::Special => Some(&mut self.special),
            LayerGroup::Dragging => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Character {
        let def = ThingDef::character(1, "human", 0x0190);
        Character::new(ObjectId(1), &def, "Ann", Point4D::new(10, 10, 0, 0), 0)
    }

    #[test]
    fn direction_and_mount_share_the_bitfield() {
        let mut character = sample();
        assert_eq!(character.direction(), Direction::South);
        character.set_mounted(true);
        character.set_direction(Direction::Northwest);
        assert!(character.is_mounted());
        assert_eq!(character.direction(), Direction::Northwest);
        character.set_mounted(false);
        assert_eq!(character.direction(), Direction::Northwest);
        assert!(!character.is_mounted());
    }

    #[test]
    fn privilege_threshold() {
        let mut character = sample();
        assert!(!character.is_privileged());
        character.set_privilege(PRIVILEGE_GM);
        assert!(character.is_privileged());
    }
}
