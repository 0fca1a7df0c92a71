//! Re-export public algorithms.

pub mod communicator;
pub mod completion;
pub mod distribute;
pub mod dual_graph;
pub mod meshgen;
pub mod partition;
pub mod wire;

pub use completion::exchange_shared;
pub use distribute::{LoadBalance, ReplicatedMesh, distribute_mesh};
pub use dual_graph::{DualGraph, mesh_to_dual};
pub use partition::{PartitionAssignment, PartitionMode, PartitionerBridge};
