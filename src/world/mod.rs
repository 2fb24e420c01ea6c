pub mod child_list;
pub mod containment;
pub mod events;
pub mod invariants;
pub mod map;
pub mod position;
pub mod region;
pub mod state;
pub mod time;
pub mod tracker;
