//! Boundary to the graph-partitioning routine.
//!
//! The bridge in [`crate::algs::partition`] only talks to a
//! [`PartitionLibrary`]: a serial mesh k-way partitioner for the initial
//! distribution and a collective adaptive repartitioner for rebalancing.
//! [`SerialLibrary`] implements both on top of any serial [`KwayEngine`]
//! ([`NativeKway`] in pure Rust, or METIS behind `metis-support`).

pub mod error;
#[cfg(feature = "metis-support")]
pub mod metis;
pub mod metrics;
pub mod native;
pub mod refine;
pub mod seed_select;
pub mod serial;

pub use self::error::LibraryStatus;
#[cfg(feature = "metis-support")]
pub use self::metis::MetisKway;
pub use self::metrics::{edge_cut, imbalance, migrated_weight, part_weights};
pub use self::native::NativeKway;
pub use self::serial::SerialLibrary;

use serde::{Deserialize, Serialize};

use crate::algs::communicator::Communicator;
use crate::algs::dual_graph::DualGraph;
use crate::mesh_error::MeshError;

/// Tunables of the partitioner bridge and the shipped libraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionerConfig {
    /// Allowed load imbalance (max part weight / average), e.g. 1.05.
    pub imbalance_tolerance: f64,
    /// Number of shared vertices that makes two elements adjacent in the
    /// initial partition's dual graph.
    pub common_nodes: usize,
    /// Relative cost of inter-process communication vs. data redistribution
    /// during adaptive repartitioning.
    pub redistribution_cost_ratio: f64,
    /// Rank that runs the initial partition and gathers counts.
    pub coordinator: usize,
    pub rng_seed: u64,
    /// Boundary refinement passes of the native engine.
    pub refine_passes: usize,
    /// Pass element weights to the library.
    pub use_weights: bool,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            imbalance_tolerance: 1.05,
            common_nodes: 2,
            redistribution_cost_ratio: 1000.0,
            coordinator: 0,
            rng_seed: 42,
            refine_passes: 8,
            use_weights: false,
        }
    }
}

impl PartitionerConfig {
    pub fn validate(&self) -> Result<(), MeshError> {
        if !self.imbalance_tolerance.is_finite() || self.imbalance_tolerance < 1.0 {
            return Err(MeshError::InvalidConfig(format!(
                "imbalance_tolerance must be a finite value >= 1.0, got {}",
                self.imbalance_tolerance
            )));
        }
        if self.common_nodes == 0 {
            return Err(MeshError::InvalidConfig(
                "common_nodes must be at least 1".into(),
            ));
        }
        check_ratio(self.redistribution_cost_ratio)
    }
}

pub(crate) fn check_ratio(itr: f64) -> Result<(), MeshError> {
    if itr.is_finite() && itr > 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidConfig(format!(
            "redistribution_cost_ratio must be finite and positive, got {itr}"
        )))
    }
}

/// Element/vertex lists of the mesh to partition (METIS `eptr`/`eind`).
#[derive(Debug, Clone, Default)]
pub struct MeshInput {
    pub eptr: Vec<usize>,
    pub eind: Vec<usize>,
    pub weights: Option<Vec<u32>>,
}

impl MeshInput {
    pub fn len(&self) -> usize {
        self.eptr.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Options of a serial k-way mesh partition. Target part weights are uniform.
#[derive(Debug, Clone, Copy)]
pub struct KwayOptions {
    pub nparts: usize,
    pub ncommon: usize,
    pub ubvec: f64,
    pub seed: u64,
}

/// This rank's slice of a distributed dual graph (ParMETIS layout).
///
/// Local vertex `i` is global vertex `vtxdist[rank] + i`; `adjncy` holds
/// global vertex numbers.
#[derive(Debug, Clone, Default)]
pub struct DistGraph {
    pub vtxdist: Vec<u64>,
    pub xadj: Vec<usize>,
    pub adjncy: Vec<u64>,
    pub vwgt: Option<Vec<u32>>,
}

impl DistGraph {
    pub fn local_len(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }
}

/// Options of an adaptive repartition. Target part weights are uniform.
#[derive(Debug, Clone, Copy)]
pub struct RepartOptions {
    pub nparts: usize,
    pub ubvec: f64,
    /// Redistribution cost ratio.
    pub itr: f64,
    pub seed: u64,
    /// Rank the serial fallback gathers the graph on.
    pub coordinator: usize,
}

/// Part of every input vertex plus the cut reported by the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryOutput {
    pub part: Vec<usize>,
    pub edge_cut: u64,
}

/// External graph partitioner.
pub trait PartitionLibrary {
    /// k-way partition of a mesh given as element/vertex lists. Serial.
    fn part_mesh_kway(
        &self,
        mesh: &MeshInput,
        opts: &KwayOptions,
    ) -> Result<LibraryOutput, LibraryStatus>;

    /// Adaptive repartition of a distributed dual graph, balancing cut
    /// against migration. Collective: every rank calls it with its slice.
    ///
    /// The outer error is a communication failure, the inner one the
    /// library's own status (identical on every rank).
    fn adaptive_repart<C: Communicator + ?Sized>(
        &self,
        graph: &DistGraph,
        opts: &RepartOptions,
        comm: &C,
    ) -> Result<Result<LibraryOutput, LibraryStatus>, MeshError>;
}

/// Serial k-way graph partitioner.
pub trait KwayEngine {
    fn part_graph_kway(
        &self,
        graph: &DualGraph,
        nparts: usize,
        ubvec: f64,
        seed: u64,
    ) -> Result<Vec<usize>, LibraryStatus>;
}
