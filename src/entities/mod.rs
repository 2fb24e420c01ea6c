pub mod character;
pub mod defs;
pub mod ids;
pub mod item;
pub mod layer;
pub mod object;
