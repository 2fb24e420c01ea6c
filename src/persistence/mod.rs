pub mod dirty;
pub mod fields;
