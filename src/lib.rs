#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-rebalance
//!
//! mesh-rebalance assigns dense, globally unique indices to the elements of a
//! mesh partitioned across cooperating processes, and computes (and
//! re-computes) a balanced partition of that mesh through a pluggable
//! graph-partitioning library.
//!
//! ## Features
//! - [`GlobalIndex`](crate::data::GlobalIndex): two-phase numbering (prefix sum of
//!   owned counts, then one exchange over shared entities)
//! - [`PartitionerBridge`](crate::algs::PartitionerBridge): initial mesh k-way
//!   partition on a coordinating rank, collective adaptive repartition
//!   balancing edge cut against migration
//! - Pluggable communication backends (serial, threads, MPI)
//! - A pure-Rust k-way engine, and METIS behind `metis-support`
//!
//! ## Control flow
//!
//! Index assignment → repartition → load balance (migration, owned by the
//! mesh) → index assignment again. Every index table is tied to the
//! directory epoch it was computed at; using it after a migration is an
//! error, never a silent wrong answer.
//!
//! ## Determinism
//!
//! All randomized decisions use `SmallRng` seeds drawn from configuration so runs are
//! reproducible.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-rebalance = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "metis-support"]
//! ```

pub mod algs;
pub mod data;
pub mod mesh_error;
pub mod partitioning;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, NoComm, ThreadComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::distribute::{LoadBalance, ReplicatedMesh, distribute_mesh};
    pub use crate::algs::partition::{PartitionAssignment, PartitionMode, PartitionerBridge};
    pub use crate::data::global_index::GlobalIndex;
    pub use crate::mesh_error::MeshError;
    #[cfg(feature = "metis-support")]
    pub use crate::partitioning::MetisKway;
    pub use crate::partitioning::{
        LibraryStatus, NativeKway, PartitionLibrary, PartitionerConfig, SerialLibrary,
    };
    pub use crate::topology::cell_type::CellType;
    pub use crate::topology::directory::EntityDirectory;
    pub use crate::topology::local_mesh::{GlobalMesh, LocalMesh};
    pub use crate::topology::ownership::PartitionRole;
    pub use crate::topology::point::PointId;
}
