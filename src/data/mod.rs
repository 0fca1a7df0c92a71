//! Data module: per-epoch numbering tables

pub mod global_index;

pub use global_index::{GlobalIndex, UNRESOLVED};
