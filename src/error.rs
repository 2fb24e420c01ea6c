use crate::entities::defs::DefId;
use crate::entities::ids::ObjectId;
use crate::world::position::Point4D;
use thiserror::Error;

/// Structural failures of the object graph. These are programming errors
/// (or misbehaving handlers), never user-facing outcomes; deny outcomes are
/// carried by `DenyResult` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("object {0} does not exist")]
    Unknown(ObjectId),

    #[error("object {0} has been deleted")]
    Deleted(ObjectId),

    #[error("object {0} is not an item")]
    NotAnItem(ObjectId),

    #[error("object {0} is not a character")]
    NotACharacter(ObjectId),

    #[error("item {0} is not a container")]
    NotAContainer(ObjectId),

    #[error("item {0} is already in limbo")]
    AlreadyInLimbo(ObjectId),

    #[error("item {0} is not in limbo")]
    NotInLimbo(ObjectId),

    #[error("layer {layer} cannot hold item {item}")]
    InvalidLayer { item: ObjectId, layer: u8 },

    #[error("position {0} is outside the map")]
    InvalidPosition(Point4D),

    #[error("character {0} is not dragging anything")]
    NothingDragged(ObjectId),

    #[error("unknown template {0:?}")]
    UnknownDef(DefId),

    #[error("template {0:?} already registered")]
    DuplicateDef(DefId),

    #[error("template {0:?} cannot be used for this kind of object")]
    WrongDefKind(DefId),

    #[error("cannot compact identifiers while {0} action(s) are in flight")]
    CompactionInFlight(u32),

    #[error("amount of item {0} must be at least 1")]
    ZeroAmount(ObjectId),

    #[error("field '{0}' is read-only")]
    ReadOnlyField(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' expects {expected}")]
    FieldType { field: String, expected: &'static str },

    #[error("record line {line}: {message}")]
    BadRecord { line: usize, message: String },

    #[error("invariant violated: {0}")]
    Invariant(String),
}
