use crate::entities::ids::ObjectId;
use crate::error::WorldError;
use crate::world::containment::Location;
use crate::world::position::Point4D;
use crate::world::state::World;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    Unchanged,
    Restored,
    /// The recorded location was gone; the item went to the fallback point.
    Fallback,
    /// The item no longer exists or could not be placed anywhere.
    Lost,
}

/// Where an item must be while an action is in progress. Handlers may
/// move things around; `restore` puts the item back with raw store calls
/// and no triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    item: ObjectId,
    location: Location,
    fallback: Point4D,
}

impl Anchor {
    pub fn capture(world: &World, item: ObjectId) -> Result<Self, WorldError> {
        Ok(Self {
            item,
            location: world.location_of(item)?,
            fallback: world.top_point(item)?,
        })
    }

    pub fn at(item: ObjectId, location: Location, fallback: Point4D) -> Self {
        Self {
            item,
            location,
            fallback,
        }
    }

    pub fn with_fallback(mut self, point: Point4D) -> Self {
        self.fallback = point;
        self
    }

    pub fn item(&self) -> ObjectId {
        self.item
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn restore(&self, world: &mut World) -> Compensation {
        let current = match world.location_of(self.item) {
            Ok(current) => current,
            Err(err) => {
                warn!(item = %self.item, "item vanished mid-action: {err}");
                return Compensation::Lost;
            }
        };
        if current == self.location {
            return Compensation::Unchanged;
        }
        warn!(
            item = %self.item,
            expected = ?self.location,
            found = ?current,
            "item moved by a handler mid-action; putting it back"
        );
        if !current.is_limbo() {
            if let Err(err) = world.detach_to_limbo(self.item) {
                error!(item = %self.item, "cannot detach for compensation: {err}");
                return Compensation::Lost;
            }
        }
        match world.attach_to(self.item, self.location) {
            Ok(()) => Compensation::Restored,
            Err(err) => {
                warn!(item = %self.item, fallback = %self.fallback, "original location unusable: {err}");
                match world.attach_to_ground(self.item, self.fallback) {
                    Ok(()) => Compensation::Fallback,
                    Err(err) => {
                        error!(item = %self.item, "compensation failed: {err}");
                        Compensation::Lost
                    }
                }
            }
        }
    }
}
