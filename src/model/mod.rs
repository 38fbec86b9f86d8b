pub mod diff;
pub mod tree;
pub mod usage;
