//! Top-level module for mesh topology abstractions.
//!
//! This module provides the element-level view of a distributed mesh:
//! - Point ids and partition roles
//! - Cell types with their face vertex lists
//! - The [`EntityDirectory`] trait consumed by index assignment and partitioning
//! - In-memory global and per-rank meshes implementing it

pub mod cell_type;
pub mod directory;
pub mod local_mesh;
pub mod ownership;
pub mod point;

pub use cell_type::CellType;
pub use directory::EntityDirectory;
pub use local_mesh::{ElementRecord, GlobalMesh, LocalMesh};
pub use ownership::PartitionRole;
pub use point::PointId;
