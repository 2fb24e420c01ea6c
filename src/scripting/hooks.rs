use crate::actions::deny::DenyResult;
use crate::entities::ids::ObjectId;
use crate::entities::layer::Layer;
use crate::error::WorldError;
use crate::world::containment::Location;
use crate::world::position::{Direction, Point4D};
use crate::world::region::RegionId;
use crate::world::state::World;
use std::fmt;
use thiserror::Error;

/// Named extension points. The `Deny*`, stacking, step, turn and region
/// hooks are asked before a change and may veto it; the rest are told
/// after it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    DenyPickupItem,
    DenyPickup,
    DenyPickupItemFrom,
    DenyPutItemInItem,
    DenyPutInItem,
    DenyPutItemIn,
    DenyPutItemOnGround,
    DenyPutOnGround,
    DenyPutItemOnRegion,
    DenyEquipOnChar,
    DenyEquip,
    GiveItem,
    GivenTo,
    ReceiveItem,
    StackOnItem,
    ItemStackOn,
    Step,
    Turn,
    RegionExit,
    RegionEnter,

    Create,
    Destroy,
    Leave,
    ItemLeave,
    Enter,
    ItemEnter,
    Unequip,
    ItemUnequip,
    Equip,
    ItemEquip,
    PutOnItem,
    ItemPutOn,
    SplitFromStack,
    StepOn,
    NewPosition,
}

/// Who a hook is being asked of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    Object(ObjectId),
    Region(RegionId),
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Object(id) => write!(f, "{id}"),
            Participant::Region(region) => write!(f, "{region}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Skip the remaining participants and the built-in checks.
    Stop,
}

/// Mutable arguments threaded through a deny chain. A handler denies by
/// writing `result`; ground drops and steps may also be redirected by
/// rewriting `point`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyArgs {
    pub result: DenyResult,
    pub actor: ObjectId,
    pub subject: Option<ObjectId>,
    pub target: Option<ObjectId>,
    pub point: Option<Point4D>,
    pub layer: Option<Layer>,
    pub direction: Option<Direction>,
}

impl DenyArgs {
    pub fn new(actor: ObjectId) -> Self {
        Self {
            result: DenyResult::Allow,
            actor,
            subject: None,
            target: None,
            point: None,
            layer: None,
            direction: None,
        }
    }

    pub fn subject(mut self, subject: ObjectId) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn target(mut self, target: ObjectId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn point(mut self, point: Point4D) -> Self {
        self.point = Some(point);
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Read-only arguments for after-the-fact notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookArgs {
    pub subject: ObjectId,
    pub actor: Option<ObjectId>,
    pub other: Option<ObjectId>,
    pub location: Option<Location>,
    pub point: Option<Point4D>,
}

impl HookArgs {
    pub fn subject(subject: ObjectId) -> Self {
        Self {
            subject,
            actor: None,
            other: None,
            location: None,
            point: None,
        }
    }

    pub fn actor(mut self, actor: ObjectId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn other(mut self, other: ObjectId) -> Self {
        self.other = Some(other);
        self
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn point(mut self, point: Point4D) -> Self {
        self.point = Some(point);
        self
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Dispatches hooks to whatever handlers are attached to a participant.
/// Handlers get the world mutably and may start nested actions; the
/// pipeline puts back anything they move out from under it.
pub trait HandlerRegistry {
    fn run_deny(
        &self,
        world: &mut World,
        hook: Hook,
        participant: Participant,
        args: &mut DenyArgs,
    ) -> Result<Flow, HandlerError>;

    fn run_notify(
        &self,
        world: &mut World,
        hook: Hook,
        participant: Participant,
        args: &HookArgs,
    ) -> Result<(), HandlerError>;
}

/// Registry with nothing attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHandlers;

impl HandlerRegistry for NoHandlers {
    fn run_deny(
        &self,
        _world: &mut World,
        _hook: Hook,
        _participant: Participant,
        _args: &mut DenyArgs,
    ) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }

    fn run_notify(
        &self,
        _world: &mut World,
        _hook: Hook,
        _participant: Participant,
        _args: &HookArgs,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}
