use crate::actions::chain::ChainEnd;
use crate::actions::deny::{DenyReason, DenyResult};
use crate::entities::ids::ObjectId;
use crate::error::WorldError;
use crate::scripting::hooks::{DenyArgs, Hook, HookArgs, Participant};
use crate::world::events::WorldEvent;
use crate::world::position::Direction;
use crate::world::state::World;
use tracing::{debug, trace};

impl World {
    /// One step in `direction`. Facing another way turns instead of
    /// stepping.
    pub fn walk(&mut self, character: ObjectId, direction: Direction) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.walk_inner(character, direction);
        self.end_action();
        result
    }

    pub fn turn(&mut self, character: ObjectId, direction: Direction) -> Result<DenyResult, WorldError> {
        self.begin_action();
        let result = self.turn_inner(character, direction);
        self.end_action();
        result
    }

    fn walk_inner(&mut self, id: ObjectId, direction: Direction) -> Result<DenyResult, WorldError> {
        let (from, facing, privileged, mounted, caps) = {
            let character = self.character(id)?;
            (
                character.point,
                character.direction(),
                character.is_privileged(),
                character.is_mounted(),
                character.caps(),
            )
        };
        if facing != direction {
            return self.turn_inner(id, direction);
        }

        let Some(mut to) = from.step(direction) else {
            return Ok(DenyResult::Deny(DenyReason::BlockedTerrain));
        };
        if !self.map.is_valid_point(to) {
            return Ok(DenyResult::Deny(DenyReason::BlockedTerrain));
        }
        match self.map.check_movement(from, to, &caps) {
            Some(z) => to = to.with_z(z),
            None if privileged => {}
            None => {
                trace!(character = %id, %from, %to, "terrain blocks step");
                return Ok(DenyResult::Deny(DenyReason::BlockedTerrain));
            }
        }

        if !privileged {
            let interval = if mounted {
                self.rules.mounted_step_ms
            } else {
                self.rules.walk_step_ms
            };
            let now = self.clock.elapsed_millis();
            if !self.character_mut(id)?.throttle.try_step(now, interval) {
                debug!(character = %id, now, "step throttled");
                return Ok(DenyResult::Deny(DenyReason::MovingTooFast));
            }
        }

        let steps = [(Hook::Step, Participant::Object(id))];
        let mut args = DenyArgs::new(id).direction(direction).point(to);
        if self.run_deny_chain(&steps, &mut args, &[]) == ChainEnd::Denied {
            return Ok(args.result);
        }
        let verdict = self.move_to(id, to)?;
        if verdict.is_denied() {
            return Ok(verdict);
        }

        for item in self.items_at(to) {
            if self.exists(item) {
                let args = HookArgs::subject(item).actor(id).point(to);
                self.notify(Hook::StepOn, Participant::Object(item), &args, None);
            }
        }
        Ok(DenyResult::Allow)
    }

    fn turn_inner(&mut self, id: ObjectId, direction: Direction) -> Result<DenyResult, WorldError> {
        let old = self.character(id)?.direction();
        if old == direction {
            return Ok(DenyResult::Allow);
        }
        let steps = [(Hook::Turn, Participant::Object(id))];
        let mut args = DenyArgs::new(id).direction(direction);
        if self.run_deny_chain(&steps, &mut args, &[]) == ChainEnd::Denied {
            return Ok(args.result);
        }
        self.character_mut(id)?.set_direction(direction);
        self.events.push(WorldEvent::DirectionChanged { entity: id, old, new: direction });
        trace!(character = %id, ?old, new = ?direction, "turned");
        Ok(DenyResult::Allow)
    }
}
