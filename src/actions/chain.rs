use crate::actions::anchor::Anchor;
use crate::actions::deny::{DenyReason, DenyResult};
use crate::entities::ids::ObjectId;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Flow, Hook, HookArgs, Participant};
use crate::world::containment::Location;
use crate::world::position::Point4D;
use crate::world::state::World;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// How a deny chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChainEnd {
    /// Everyone was asked and nobody objected; built-in checks still apply.
    Completed,
    /// A handler stopped the chain while allowing; skip built-in checks.
    Overridden,
    Denied,
}

impl World {
    /// Asks each participant in order. The first deny ends the chain.
    /// Handler failures count as "no objection". After each participant,
    /// anchored items are put back if a handler moved them.
    pub(crate) fn run_deny_chain(
        &mut self,
        steps: &[(Hook, Participant)],
        args: &mut DenyArgs,
        anchors: &[Anchor],
    ) -> ChainEnd {
        let handlers = Rc::clone(&self.handlers);
        for &(hook, participant) in steps {
            let flow = match handlers.run_deny(self, hook, participant, args) {
                Ok(flow) => flow,
                Err(err) => {
                    error!(?hook, %participant, "deny handler failed: {err}");
                    Flow::Continue
                }
            };
            for anchor in anchors {
                anchor.restore(self);
            }
            if let DenyResult::Deny(reason) = args.result {
                debug!(?hook, %participant, ?reason, "denied");
                return ChainEnd::Denied;
            }
            if flow == Flow::Stop {
                return ChainEnd::Overridden;
            }
        }
        ChainEnd::Completed
    }

    pub(crate) fn notify(
        &mut self,
        hook: Hook,
        participant: Participant,
        args: &HookArgs,
        anchor: Option<&Anchor>,
    ) {
        let handlers = Rc::clone(&self.handlers);
        if let Err(err) = handlers.run_notify(self, hook, participant, args) {
            error!(?hook, %participant, "notify handler failed: {err}");
        }
        if let Some(anchor) = anchor {
            anchor.restore(self);
        }
    }

    /// Who answers for a location: the holder, or the region of a ground tile.
    pub(crate) fn holder_participant(&mut self, location: Location) -> Option<Participant> {
        match location {
            Location::Limbo => None,
            Location::Ground(point) => Some(Participant::Region(self.region_at(point))),
            other => other.parent().map(Participant::Object),
        }
    }

    /// Moves an item through the store with leave and enter notifications.
    /// Each notification is followed by compensation, so handlers cannot
    /// strand the item halfway.
    pub(crate) fn relocate(
        &mut self,
        item: ObjectId,
        actor: ObjectId,
        to: Location,
    ) -> Result<(), WorldError> {
        let from = self.location_of(item)?;
        let fallback = self.character(actor)?.point;
        let equip_layer = self.def_of(item)?.layer;

        let (leave, item_leave) = match from {
            Location::Layer { layer, .. } if Some(layer) == equip_layer => {
                (Hook::Unequip, Hook::ItemUnequip)
            }
            _ => (Hook::Leave, Hook::ItemLeave),
        };
        let stay = Anchor::at(item, from, fallback);
        let args = HookArgs::subject(item).actor(actor).location(from);
        self.notify(leave, Participant::Object(item), &args, Some(&stay));
        if let Some(holder) = self.holder_participant(from) {
            self.notify(item_leave, holder, &args, Some(&stay));
        }

        if !self.location_of(item)?.is_limbo() {
            self.detach_to_limbo(item)?;
        }
        if let Err(err) = self.attach_to(item, to) {
            // leave handlers can pull the destination out from under us
            let outcome = stay.restore(self);
            warn!(%item, %actor, ?to, ?outcome, "destination unusable, item put back: {err}");
            return Err(err);
        }
        let to = self.location_of(item)?;

        let (enter, item_enter) = match to {
            Location::Layer { layer, .. } if Some(layer) == equip_layer => {
                (Hook::Equip, Hook::ItemEquip)
            }
            _ => (Hook::Enter, Hook::ItemEnter),
        };
        let stay = Anchor::at(item, to, fallback);
        let args = HookArgs::subject(item).actor(actor).location(to);
        self.notify(enter, Participant::Object(item), &args, Some(&stay));
        if let Some(holder) = self.holder_participant(to) {
            self.notify(item_enter, holder, &args, Some(&stay));
        }
        debug!(%item, %actor, ?from, ?to, "item relocated");
        Ok(())
    }

    /// Built-in reach check: same map plane and within reach range.
    pub fn can_reach_point(&self, actor: ObjectId, point: Point4D) -> Result<DenyResult, WorldError> {
        let from = self.character(actor)?.point;
        if from.m != point.m || from.distance(point) > self.rules.reach_range {
            return Ok(DenyResult::Deny(DenyReason::TooFarAway));
        }
        Ok(DenyResult::Allow)
    }

    pub fn can_reach(&self, actor: ObjectId, target: ObjectId) -> Result<DenyResult, WorldError> {
        let point = self.top_point(target)?;
        self.can_reach_point(actor, point)
    }
}
