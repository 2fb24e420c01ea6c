use crate::actions::anchor::Anchor;
use crate::actions::chain::ChainEnd;
use crate::actions::deny::{DenyReason, DenyResult};
use crate::entities::ids::ObjectId;
use crate::entities::item::ItemFlags;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Hook, HookArgs, Participant};
use crate::world::containment::{Location, CONTAINER_MAX_XY, CONTAINER_MIN_XY};
use crate::world::position::Point4D;
use crate::world::state::World;
use tracing::debug;

impl World {
    /// The item in the actor's dragging slot.
    pub fn dragged(&self, actor: ObjectId) -> Result<ObjectId, WorldError> {
        self.character(actor)?
            .dragging
            .ok_or(WorldError::NothingDragged(actor))
    }

    /// Drops the dragged item into a container, at `at` or at a random
    /// spot, then tries to stack it onto a sibling.
    pub fn put_in_container(
        &mut self,
        actor: ObjectId,
        container: ObjectId,
        at: Option<(u16, u16)>,
    ) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.put_into(actor, container, at, true);
        self.end_action();
        result
    }

    pub fn put_on_ground(&mut self, actor: ObjectId, point: Point4D) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.drop_on_ground(actor, point, true);
        self.end_action();
        result
    }

    /// Drops the dragged item onto another item: into it when it is a
    /// container, otherwise next to it with an attempt to stack.
    pub fn put_on_item(&mut self, actor: ObjectId, target: ObjectId) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.put_on_item_inner(actor, target);
        self.end_action();
        result
    }

    /// Hands the dragged item to a character. Wearable items are equipped;
    /// anything else goes into the receiver's backpack.
    pub fn put_on_character(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
    ) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.put_on_character_inner(actor, target);
        self.end_action();
        result
    }

    pub(crate) fn put_into(
        &mut self,
        actor: ObjectId,
        container: ObjectId,
        at: Option<(u16, u16)>,
        stack: bool,
    ) -> Result<DenyResult, WorldError> {
        let item = self.dragged(actor)?;
        if !self.is_container(container)? {
            return Err(WorldError::NotAContainer(container));
        }
        if self.is_within(container, item)? {
            return Ok(DenyResult::Deny(DenyReason::CannotContainItself));
        }
        let anchor = Anchor::capture(self, item)?;
        let steps = [
            (Hook::DenyPutItemInItem, Participant::Object(actor)),
            (Hook::DenyPutInItem, Participant::Object(item)),
            (Hook::DenyPutItemIn, Participant::Object(container)),
        ];
        let mut args = DenyArgs::new(actor).subject(item).target(container);
        match self.run_deny_chain(&steps, &mut args, &[anchor]) {
            ChainEnd::Denied => return Ok(args.result),
            ChainEnd::Overridden => {}
            ChainEnd::Completed => {
                if self.item(container)?.flags.contains(ItemFlags::LOCKED) {
                    return Ok(DenyResult::Deny(DenyReason::Locked));
                }
                let verdict = self.can_reach(actor, container)?;
                if verdict.is_denied() {
                    return Ok(verdict);
                }
            }
        }
        // a handler may have shuffled things so that the move would now
        // close a loop
        if self.is_within(container, item)? {
            return Ok(DenyResult::Deny(DenyReason::CannotContainItself));
        }
        let (x, y) = match at {
            Some(spot) => spot,
            None => (
                self.rng.roll_range(CONTAINER_MIN_XY, CONTAINER_MAX_XY),
                self.rng.roll_range(CONTAINER_MIN_XY, CONTAINER_MAX_XY),
            ),
        };
        self.relocate(item, actor, Location::Container { container, x, y })?;
        debug!(%actor, %item, %container, x, y, "put in container");
        if stack && self.exists(item) {
            self.stack_into_any(actor, container, item)?;
        }
        Ok(DenyResult::Allow)
    }

    /// Ground drop deny chain for `item`. Handlers may redirect the drop
    /// by rewriting the point; the final point comes back with the result.
    pub(crate) fn ground_chain(
        &mut self,
        actor: ObjectId,
        item: ObjectId,
        point: Point4D,
    ) -> Result<(ChainEnd, DenyResult, Point4D), WorldError> {
        let region = self.region_at(point);
        let anchor = Anchor::capture(self, item)?.with_fallback(self.character(actor)?.point);
        let steps = [
            (Hook::DenyPutItemOnGround, Participant::Object(actor)),
            (Hook::DenyPutOnGround, Participant::Object(item)),
            (Hook::DenyPutItemOnRegion, Participant::Region(region)),
        ];
        let mut args = DenyArgs::new(actor).subject(item).point(point);
        let end = self.run_deny_chain(&steps, &mut args, &[anchor]);
        let point = args.point.unwrap_or(point);
        if end != ChainEnd::Denied && !self.map.is_valid_point(point) {
            return Err(WorldError::InvalidPosition(point));
        }
        Ok((end, args.result, point))
    }

    pub(crate) fn drop_on_ground(
        &mut self,
        actor: ObjectId,
        point: Point4D,
        stack: bool,
    ) -> Result<DenyResult, WorldError> {
        let item = self.dragged(actor)?;
        if !self.map.is_valid_point(point) {
            return Err(WorldError::InvalidPosition(point));
        }
        let (end, result, point) = self.ground_chain(actor, item, point)?;
        match end {
            ChainEnd::Denied => return Ok(result),
            ChainEnd::Overridden => {}
            ChainEnd::Completed => {
                let verdict = self.can_reach_point(actor, point)?;
                if verdict.is_denied() {
                    return Ok(verdict);
                }
            }
        }
        self.relocate(item, actor, Location::Ground(point))?;
        debug!(%actor, %item, %point, "dropped on ground");
        if stack && self.exists(item) {
            self.stack_onto_tile(actor, item)?;
        }
        Ok(DenyResult::Allow)
    }

    fn put_on_item_inner(&mut self, actor: ObjectId, target: ObjectId) -> Result<DenyResult, WorldError> {
        let item = self.dragged(actor)?;
        if item == target {
            return Ok(DenyResult::Deny(DenyReason::CannotContainItself));
        }
        if self.is_container(target)? {
            return self.put_into(actor, target, None, true);
        }
        let verdict = match self.location_of(target)? {
            Location::Container { container, x, y } => {
                self.put_into(actor, container, Some((x, y)), false)?
            }
            Location::Ground(point) => self.drop_on_ground(actor, point, false)?,
            Location::Layer { .. } | Location::Dragging { .. } | Location::Limbo => {
                return Ok(DenyResult::Deny(DenyReason::NoMessage));
            }
        };
        if verdict.is_denied() || !self.exists(item) || !self.exists(target) {
            return Ok(verdict);
        }
        if !self.try_stack(actor, item, target)? && self.exists(item) {
            let args = HookArgs::subject(item).actor(actor).other(target);
            self.notify(Hook::PutOnItem, Participant::Object(item), &args, None);
            self.notify(Hook::ItemPutOn, Participant::Object(target), &args, None);
        }
        Ok(DenyResult::Allow)
    }

    fn put_on_character_inner(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
    ) -> Result<DenyResult, WorldError> {
        let item = self.dragged(actor)?;
        self.character(target)?;
        if let Some(layer) = self.def_of(item)?.layer {
            if layer.is_valid() && !layer.is_dragging() {
                return self.equip_dragged(actor, target, item, layer);
            }
        }
        if target == actor {
            return self.put_in_own_backpack(actor);
        }
        let anchor = Anchor::capture(self, item)?;
        let steps = [
            (Hook::GiveItem, Participant::Object(actor)),
            (Hook::GivenTo, Participant::Object(item)),
            (Hook::ReceiveItem, Participant::Object(target)),
        ];
        let mut args = DenyArgs::new(actor).subject(item).target(target);
        match self.run_deny_chain(&steps, &mut args, &[anchor]) {
            ChainEnd::Denied => Ok(args.result),
            // a handler took the item over
            ChainEnd::Overridden => Ok(DenyResult::Allow),
            ChainEnd::Completed => {
                let verdict = self.can_reach(actor, target)?;
                if verdict.is_denied() {
                    return Ok(verdict);
                }
                let Some(pack) = self.backpack(target)? else {
                    return Ok(DenyResult::Deny(DenyReason::NoRoom));
                };
                debug!(%actor, %item, %target, "giving item");
                self.put_into(actor, pack, None, true)
            }
        }
    }

    fn put_in_own_backpack(&mut self, actor: ObjectId) -> Result<DenyResult, WorldError> {
        match self.backpack(actor)? {
            Some(pack) => self.put_into(actor, pack, None, true),
            None => Ok(DenyResult::Deny(DenyReason::NoRoom)),
        }
    }
}
