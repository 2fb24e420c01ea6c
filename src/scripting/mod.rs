pub mod hooks;
pub mod registry;
