use std::fmt;

/// Why an action was refused. Every variant maps to text a player may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    CannotPickUp,
    TooFarAway,
    OutOfSight,
    NotYours,
    AlreadyHoldingOrOccupied,
    Locked,
    CannotContainItself,
    NoRoom,
    MovingTooFast,
    BlockedTerrain,
    RegionRefused,
    /// Refused silently; the client just removes the item from view.
    RemoveFromView,
    /// Refused silently; a handler has already told the player why.
    NoMessage,
}

impl DenyReason {
    pub fn message(self) -> Option<&'static str> {
        match self {
            DenyReason::CannotPickUp => Some("You cannot pick that up."),
            DenyReason::TooFarAway => Some("That is too far away."),
            DenyReason::OutOfSight => Some("That is out of sight."),
            DenyReason::NotYours => Some("That does not belong to you."),
            DenyReason::AlreadyHoldingOrOccupied => Some("You are already holding an item."),
            DenyReason::Locked => Some("That is locked."),
            DenyReason::CannotContainItself => Some("You cannot put that inside itself."),
            DenyReason::NoRoom => Some("There is no room for that."),
            DenyReason::MovingTooFast => Some("You are moving too fast."),
            DenyReason::BlockedTerrain => Some("You cannot go there."),
            DenyReason::RegionRefused => Some("You may not enter."),
            DenyReason::RemoveFromView | DenyReason::NoMessage => None,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => f.write_str(message),
            None => write!(f, "{self:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DenyResult {
    #[default]
    Allow,
    Deny(DenyReason),
}

impl DenyResult {
    pub fn is_allowed(self) -> bool {
        matches!(self, DenyResult::Allow)
    }

    pub fn is_denied(self) -> bool {
        !self.is_allowed()
    }

    pub fn reason(self) -> Option<DenyReason> {
        match self {
            DenyResult::Allow => None,
            DenyResult::Deny(reason) => Some(reason),
        }
    }
}

impl From<DenyReason> for DenyResult {
    fn from(reason: DenyReason) -> Self {
        DenyResult::Deny(reason)
    }
}
