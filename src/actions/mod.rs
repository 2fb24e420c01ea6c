pub mod anchor;
pub mod chain;
pub mod deny;
pub mod equip;
pub mod movement;
pub mod pickup;
pub mod put;
pub mod stacking;
pub mod throttle;
