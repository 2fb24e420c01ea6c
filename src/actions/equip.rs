use crate::actions::anchor::Anchor;
use crate::actions::chain::ChainEnd;
use crate::actions::deny::{DenyReason, DenyResult};
use crate::entities::ids::ObjectId;
use crate::entities::layer::Layer;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Hook, Participant};
use crate::world::containment::Location;
use crate::world::position::Point4D;
use crate::world::state::World;
use tracing::debug;

/// An occupant that has to make room, and where it will land.
#[derive(Debug, Clone, Copy)]
struct Eviction {
    item: ObjectId,
    point: Point4D,
}

impl World {
    /// Equips the dragged item on `target` in the layer its template names.
    /// Occupants in the way are taken off and dropped at the wearer's feet;
    /// every one of them has to be allowed to move before anything does.
    pub(crate) fn equip_dragged(
        &mut self,
        actor: ObjectId,
        target: ObjectId,
        item: ObjectId,
        layer: Layer,
    ) -> Result<DenyResult, WorldError> {
        let anchor = Anchor::capture(self, item)?;
        let Some(evictions) = self.plan_evictions(target, item, layer)? else {
            return Ok(DenyResult::Deny(DenyReason::AlreadyHoldingOrOccupied));
        };
        anchor.restore(self);

        let steps = [
            (Hook::DenyEquipOnChar, Participant::Object(actor)),
            (Hook::DenyEquip, Participant::Object(target)),
            (Hook::DenyEquip, Participant::Object(item)),
        ];
        let mut args = DenyArgs::new(actor).subject(item).target(target).layer(layer);
        match self.run_deny_chain(&steps, &mut args, &[anchor]) {
            ChainEnd::Denied => return Ok(args.result),
            ChainEnd::Overridden => {}
            ChainEnd::Completed if actor != target => {
                let verdict = self.can_reach(actor, target)?;
                if verdict.is_denied() {
                    return Ok(verdict);
                }
            }
            ChainEnd::Completed => {}
        }

        for eviction in evictions {
            let still_worn = matches!(
                self.location_of(eviction.item),
                Ok(Location::Layer { character, .. }) if character == target
            );
            if still_worn {
                debug!(item = %eviction.item, %target, point = %eviction.point, "evicting before equip");
                self.relocate(eviction.item, target, Location::Ground(eviction.point))?;
            }
        }
        self.relocate(item, actor, Location::Layer { character: target, layer })?;
        debug!(%actor, %item, %target, %layer, "equipped");
        Ok(DenyResult::Allow)
    }

    /// Asks every conflicting occupant's pickup and ground-drop chains on
    /// behalf of the wearer. `None` when any of them refuses.
    fn plan_evictions(
        &mut self,
        target: ObjectId,
        item: ObjectId,
        layer: Layer,
    ) -> Result<Option<Vec<Eviction>>, WorldError> {
        let two_handed = self.def_of(item)?.two_handed;
        let feet = self.character(target)?.point;
        let mut planned = Vec::new();
        for occupant in self.conflicting_occupants(target, layer, two_handed)? {
            if self.check_pick_up(target, occupant)?.is_denied() {
                debug!(%occupant, %target, "occupant refused to come off");
                return Ok(None);
            }
            let (end, _, point) = self.ground_chain(target, occupant, feet)?;
            if end == ChainEnd::Denied {
                debug!(%occupant, %target, "occupant refused to be dropped");
                return Ok(None);
            }
            planned.push(Eviction { item: occupant, point });
        }
        Ok(Some(planned))
    }
}
