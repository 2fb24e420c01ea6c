use crate::actions::anchor::Anchor;
use crate::actions::chain::ChainEnd;
use crate::actions::deny::{DenyReason, DenyResult};
use crate::entities::ids::ObjectId;
use crate::entities::item::ItemFlags;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Hook, HookArgs, Participant};
use crate::world::containment::Location;
use crate::world::state::World;
use tracing::debug;

impl World {
    /// Picks an item (or `amount` of a stack) into the actor's dragging
    /// slot.
    pub fn pick_up(
        &mut self,
        actor: ObjectId,
        item: ObjectId,
        amount: Option<u32>,
    ) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.pick_up_inner(actor, item, amount);
        self.end_action();
        result
    }

    fn pick_up_inner(
        &mut self,
        actor: ObjectId,
        item: ObjectId,
        amount: Option<u32>,
    ) -> Result<DenyResult, WorldError> {
        self.item(item)?;
        if let Some(held) = self.character(actor)?.dragging {
            if held == item {
                return Ok(DenyResult::Allow);
            }
            if !self.stow_dragged(actor)? {
                return Ok(DenyResult::Deny(DenyReason::AlreadyHoldingOrOccupied));
            }
        }
        let verdict = self.check_pick_up(actor, item)?;
        if verdict.is_denied() {
            return Ok(verdict);
        }
        self.split_for_pickup(actor, item, amount)?;
        self.relocate(item, actor, Location::Dragging { character: actor })?;
        debug!(%actor, %item, "picked up");
        Ok(DenyResult::Allow)
    }

    /// Pickup deny chain plus built-in checks, without moving anything.
    /// Order: actor, item, then whoever holds the item (container,
    /// character, or the region of its tile).
    pub(crate) fn check_pick_up(
        &mut self,
        actor: ObjectId,
        item: ObjectId,
    ) -> Result<DenyResult, WorldError> {
        let source = self.location_of(item)?;
        let feet = self.character(actor)?.point;
        let anchor = Anchor::capture(self, item)?.with_fallback(feet);
        let mut steps = vec![
            (Hook::DenyPickupItem, Participant::Object(actor)),
            (Hook::DenyPickup, Participant::Object(item)),
        ];
        if let Some(holder) = self.holder_participant(source) {
            steps.push((Hook::DenyPickupItemFrom, holder));
        }
        let mut args = DenyArgs::new(actor).subject(item);
        if let Some(parent) = source.parent() {
            args = args.target(parent);
        }
        match self.run_deny_chain(&steps, &mut args, &[anchor]) {
            ChainEnd::Denied => Ok(args.result),
            ChainEnd::Overridden => Ok(DenyResult::Allow),
            ChainEnd::Completed => self.pick_up_policy(actor, item, source),
        }
    }

    fn pick_up_policy(
        &self,
        actor: ObjectId,
        item: ObjectId,
        source: Location,
    ) -> Result<DenyResult, WorldError> {
        if self.item(item)?.flags.contains(ItemFlags::IMMOVABLE) {
            return Ok(DenyResult::Deny(DenyReason::CannotPickUp));
        }
        if let Location::Container { container, .. } = source {
            if self.item(container)?.flags.contains(ItemFlags::LOCKED) {
                return Ok(DenyResult::Deny(DenyReason::Locked));
            }
        }
        let (top, _) = self.top_level(item)?;
        if top != actor && self.object(top)?.is_character() {
            return Ok(DenyResult::Deny(DenyReason::NotYours));
        }
        self.can_reach(actor, item)
    }

    /// Takes `amount` off a stack for pickup; equipped or held stacks are
    /// taken whole.
    fn split_for_pickup(
        &mut self,
        actor: ObjectId,
        item: ObjectId,
        amount: Option<u32>,
    ) -> Result<(), WorldError> {
        let Some(amount) = amount else {
            return Ok(());
        };
        let location = self.location_of(item)?;
        if matches!(location, Location::Layer { .. } | Location::Dragging { .. }) {
            return Ok(());
        }
        if let Some(remainder) = self.split_stack(item, amount)? {
            self.notify(
                Hook::SplitFromStack,
                Participant::Object(remainder),
                &HookArgs::subject(remainder).actor(actor).other(item),
                None,
            );
        }
        Ok(())
    }

    /// Keeps `keep` units in `item` and puts the rest into a new stack at
    /// the same location. `None` when there is nothing to split off.
    pub fn split_stack(&mut self, item: ObjectId, keep: u32) -> Result<Option<ObjectId>, WorldError> {
        let current = self.item(item)?.amount;
        if keep == 0 || keep >= current {
            return Ok(None);
        }
        let location = self.location_of(item)?;
        let remainder = self.duplicate_item(item, current - keep, location)?;
        self.set_amount(item, keep)?;
        debug!(%item, %remainder, kept = keep, split = current - keep, "stack split");
        Ok(Some(remainder))
    }

    /// Copy of an item's appearance and template with a new amount.
    pub fn duplicate_item(
        &mut self,
        item: ObjectId,
        amount: u32,
        at: Location,
    ) -> Result<ObjectId, WorldError> {
        let (def, model, color, name, flags) = {
            let source = self.item(item)?;
            (source.def, source.model, source.color, source.name.clone(), source.flags)
        };
        let copy = self.create_item(def, amount, at)?;
        let target = self.item_mut(copy)?;
        target.model = model;
        target.color = color;
        target.name = name;
        target.flags = flags;
        Ok(copy)
    }

    /// Puts the dragged item into the actor's backpack. True when the
    /// dragging slot ends up empty.
    pub(crate) fn stow_dragged(&mut self, actor: ObjectId) -> Result<bool, WorldError> {
        if self.character(actor)?.dragging.is_none() {
            return Ok(true);
        }
        let Some(pack) = self.backpack(actor)? else {
            return Ok(false);
        };
        let verdict = self.put_in_container(actor, pack, None)?;
        Ok(verdict.is_allowed() && self.character(actor)?.dragging.is_none())
    }
}
