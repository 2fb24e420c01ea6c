use crate::actions::anchor::Anchor;
use crate::actions::chain::ChainEnd;
use crate::entities::ids::ObjectId;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Hook, Participant};
use crate::world::state::World;
use tracing::debug;

impl World {
    /// Merges `moving` into `waiting` if the two are compatible and neither
    /// side objects. True when `moving` is gone.
    pub fn try_stack(
        &mut self,
        actor: ObjectId,
        moving: ObjectId,
        waiting: ObjectId,
    ) -> Result<bool, WorldError> {
        if self.merged_amount(moving, waiting)?.is_none() {
            return Ok(false);
        }
        let anchors = [Anchor::capture(self, moving)?, Anchor::capture(self, waiting)?];
        let steps = [
            (Hook::StackOnItem, Participant::Object(moving)),
            (Hook::ItemStackOn, Participant::Object(waiting)),
        ];
        let mut args = DenyArgs::new(actor).subject(moving).target(waiting);
        if self.run_deny_chain(&steps, &mut args, &anchors) == ChainEnd::Denied {
            debug!(%moving, %waiting, "stacking refused");
            return Ok(false);
        }
        if !self.exists(moving) || !self.exists(waiting) {
            return Ok(false);
        }
        // amounts may have changed under the handlers
        self.try_merge(moving, waiting)
    }

    /// Tries every sibling in the container until one takes the item.
    pub(crate) fn stack_into_any(
        &mut self,
        actor: ObjectId,
        container: ObjectId,
        item: ObjectId,
    ) -> Result<bool, WorldError> {
        for sibling in self.contents(container)? {
            if sibling == item || !self.exists(sibling) {
                continue;
            }
            if !self.could_be_stacked(item, sibling)? {
                continue;
            }
            if self.try_stack(actor, item, sibling)? {
                return Ok(true);
            }
            if !self.exists(item) {
                return Ok(false);
            }
        }
        Ok(false)
    }

    /// Same as `stack_into_any` for the items on the item's tile.
    pub(crate) fn stack_onto_tile(&mut self, actor: ObjectId, item: ObjectId) -> Result<bool, WorldError> {
        let point = self.item(item)?.point;
        for other in self.items_at(point) {
            if other == item || !self.exists(other) {
                continue;
            }
            if !self.could_be_stacked(item, other)? {
                continue;
            }
            if self.try_stack(actor, item, other)? {
                return Ok(true);
            }
            if !self.exists(item) {
                return Ok(false);
            }
        }
        Ok(false)
    }
}
