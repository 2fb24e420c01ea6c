use serde::{Deserialize, Serialize};
use std::fmt;

/// Equipment slot on a character. Numbering follows the client's paperdoll
/// layout: everything below `VISIBLE_LIMIT` is drawn, the rest is bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Layer(pub u8);

/// Which child list of a character a layer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerGroup {
    Visible,
    Invisible,
    Special,
    Dragging,
}

impl Layer {
    pub const HAND1: Layer = Layer(1);
    pub const HAND2: Layer = Layer(2);
    pub const SHOES: Layer = Layer(3);
    pub const PANTS: Layer = Layer(4);
    pub const SHIRT: Layer = Layer(5);
    pub const HELM: Layer = Layer(6);
    pub const GLOVES: Layer = Layer(7);
    pub const RING: Layer = Layer(8);
    pub const NECK: Layer = Layer(10);
    pub const HAIR: Layer = Layer(11);
    pub const WAIST: Layer = Layer(12);
    pub const CHEST: Layer = Layer(13);
    pub const BRACELET: Layer = Layer(14);
    pub const BEARD: Layer = Layer(16);
    pub const COAT: Layer = Layer(17);
    pub const EARRINGS: Layer = Layer(18);
    pub const ARMS: Layer = Layer(19);
    pub const CLOAK: Layer = Layer(20);
    pub const BACKPACK: Layer = Layer(21);
    pub const ROBE: Layer = Layer(22);
    pub const SKIRT: Layer = Layer(23);
    pub const LEGS: Layer = Layer(24);
    pub const MOUNT: Layer = Layer(25);
    pub const BANK_BOX: Layer = Layer(29);
    /// Unbounded layer for effects and markers; never evicts.
    pub const SPECIAL: Layer = Layer(30);
    pub const DRAGGING: Layer = Layer(31);

    pub const VISIBLE_LIMIT: u8 = 25;
    pub const MAX: u8 = 63;

    pub fn is_valid(self) -> bool {
        self.0 >= 1 && self.0 <= Self::MAX
    }

    pub fn is_visible(self) -> bool {
        self.0 >= 1 && self.0 < Self::VISIBLE_LIMIT
    }

    pub fn is_hand(self) -> bool {
        self == Self::HAND1 || self == Self::HAND2
    }

    pub fn is_special(self) -> bool {
        self == Self::SPECIAL
    }

    pub fn is_dragging(self) -> bool {
        self == Self::DRAGGING
    }

    pub fn group(self) -> LayerGroup {
        if self.is_visible() {
            LayerGroup::Visible
        } else if self.is_special() {
            LayerGroup::Special
        } else if self.is_dragging() {
            LayerGroup::Dragging
        } else {
            LayerGroup::Invisible
        }
    }

    /// The other hand, for hand layers.
    pub fn opposite_hand(self) -> Option<Layer> {
        match self {
            Self::HAND1 => Some(Self::HAND2),
            Self::HAND2 => Some(Self::HAND1),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
