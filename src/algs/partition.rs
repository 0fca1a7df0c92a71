//! Partitioner bridge: turns a distributed mesh into partitioner input and
//! the partitioner's answer into a per-element target rank.
//!
//! Two entry points:
//!
//! * [`PartitionerBridge::initial_partition`] runs a serial mesh k-way
//!   partition on the coordinating rank, for a mesh that still lives there
//!   entirely. Other ranks get an all-zero assignment. The coordinator holds
//!   the whole element/vertex list in memory, which bounds the mesh size
//!   this path can handle.
//! * [`PartitionerBridge::repartition`] runs a collective adaptive
//!   repartition of the dual graph, with vertices numbered by a current
//!   [`GlobalIndex`].
//!
//! Both return a dense array indexed by element slot. Slots of elements this
//! rank does not own are left at 0 and carry no meaning.

use crate::algs::communicator::{Communicator, all_gather_u64};
use crate::data::global_index::GlobalIndex;
use crate::mesh_error::MeshError;
use crate::partitioning::{
    DistGraph, KwayOptions, LibraryOutput, LibraryStatus, MeshInput, PartitionLibrary,
    PartitionerConfig, RepartOptions, SerialLibrary, check_ratio,
};
use crate::topology::directory::EntityDirectory;

/// How an assignment was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionMode {
    /// Serial mesh k-way partition on the coordinating rank.
    Initial,
    /// Collective adaptive repartition.
    Adaptive,
    /// Degenerate input (one rank, no elements, or no adjacency): the
    /// library was not called and every element stays on rank 0.
    Trivial,
}

/// Target rank of every local element slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssignment {
    targets: Vec<usize>,
    edge_cut: Option<u64>,
    mode: PartitionMode,
}

impl PartitionAssignment {
    fn trivial(slots: usize) -> Self {
        Self {
            targets: vec![0; slots],
            edge_cut: None,
            mode: PartitionMode::Trivial,
        }
    }

    /// Target rank per element slot.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    pub fn into_targets(self) -> Vec<usize> {
        self.targets
    }

    pub fn target(&self, slot: usize) -> Option<usize> {
        self.targets.get(slot).copied()
    }

    /// Edge cut reported by the library; `None` where it was not called.
    pub fn edge_cut(&self) -> Option<u64> {
        self.edge_cut
    }

    pub fn mode(&self) -> PartitionMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Owned elements of `dir` whose target differs from `rank`.
    pub fn migrating<D>(&self, dir: &D, rank: usize) -> usize
    where
        D: EntityDirectory + ?Sized,
    {
        dir.owned()
            .filter(|&e| self.target(dir.slot(e)).is_some_and(|t| t != rank))
            .count()
    }
}

/// Drives a [`PartitionLibrary`] with the configured tolerances.
#[derive(Debug, Clone)]
pub struct PartitionerBridge<L = SerialLibrary> {
    library: L,
    config: PartitionerConfig,
}

impl Default for PartitionerBridge<SerialLibrary> {
    fn default() -> Self {
        let config = PartitionerConfig::default();
        Self {
            library: SerialLibrary::from_config(&config),
            config,
        }
    }
}

impl<L: PartitionLibrary> PartitionerBridge<L> {
    pub fn new(library: L, config: PartitionerConfig) -> Result<Self, MeshError> {
        config.validate()?;
        Ok(Self { library, config })
    }

    pub fn config(&self) -> &PartitionerConfig {
        &self.config
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Partition a mesh held by the coordinating rank into `comm.size()` parts.
    ///
    /// Only the coordinator calls the library; no communication happens.
    /// The whole element/vertex list is materialised on the coordinator, so
    /// this does not scale past what one process can hold.
    ///
    /// The coordinator's result is authoritative. Other ranks return an
    /// all-zero [`PartitionMode::Initial`] assignment without looking at the
    /// mesh, so they report neither a [`PartitionMode::Trivial`] outcome nor
    /// a library failure seen by the coordinator.
    pub fn initial_partition<D, C>(&self, dir: &D, comm: &C) -> Result<PartitionAssignment, MeshError>
    where
        D: EntityDirectory + ?Sized,
        C: Communicator + ?Sized,
    {
        let nparts = comm.size();
        self.check_coordinator(nparts)?;
        if nparts == 1 {
            return Ok(PartitionAssignment::trivial(dir.slot_count()));
        }
        if comm.rank() != self.config.coordinator {
            return Ok(PartitionAssignment {
                targets: vec![0; dir.slot_count()],
                edge_cut: None,
                mode: PartitionMode::Initial,
            });
        }

        let owned: Vec<D::Entity> = dir.owned().collect();
        let has_edges = owned
            .iter()
            .any(|&e| dir.face_neighbors(e).any(|n| n.is_some()));
        if !has_edges {
            log::debug!("initial partition: {} elements without adjacency", owned.len());
            return Ok(PartitionAssignment::trivial(dir.slot_count()));
        }

        let mut mesh = MeshInput {
            eptr: Vec::with_capacity(owned.len() + 1),
            eind: Vec::new(),
            weights: self
                .config
                .use_weights
                .then(|| owned.iter().map(|&e| dir.weight(e)).collect()),
        };
        mesh.eptr.push(0);
        for &e in &owned {
            mesh.eind.extend_from_slice(dir.vertices(e));
            mesh.eptr.push(mesh.eind.len());
        }
        let opts = KwayOptions {
            nparts,
            ncommon: self.config.common_nodes,
            ubvec: self.config.imbalance_tolerance,
            seed: self.config.rng_seed,
        };
        let out = self.library.part_mesh_kway(&mesh, &opts).map_err(library_failure)?;
        log::debug!(
            "initial partition of {} elements into {nparts} parts, cut {}",
            owned.len(),
            out.edge_cut
        );
        self.scatter_to_slots(dir, &owned, out, nparts, PartitionMode::Initial)
    }

    /// Adaptive repartition with the configured redistribution cost ratio.
    /// Collective.
    pub fn repartition<D, C>(
        &self,
        dir: &D,
        index: &GlobalIndex,
        comm: &C,
    ) -> Result<PartitionAssignment, MeshError>
    where
        D: EntityDirectory + ?Sized,
        C: Communicator + ?Sized,
    {
        self.repartition_with_ratio(dir, index, comm, self.config.redistribution_cost_ratio)
    }

    /// Adaptive repartition with an explicit redistribution cost ratio `itr`.
    /// Collective.
    ///
    /// `index` must have been computed for the current epoch of `dir`.
    pub fn repartition_with_ratio<D, C>(
        &self,
        dir: &D,
        index: &GlobalIndex,
        comm: &C,
        itr: f64,
    ) -> Result<PartitionAssignment, MeshError>
    where
        D: EntityDirectory + ?Sized,
        C: Communicator + ?Sized,
    {
        check_ratio(itr)?;
        index.ensure_current(dir)?;
        let nparts = comm.size();
        self.check_coordinator(nparts)?;
        if index.vtxdist().len() != nparts + 1 {
            return Err(MeshError::LengthMismatch {
                what: "offset table",
                expected: nparts + 1,
                got: index.vtxdist().len(),
            });
        }
        if nparts == 1 || index.total() == 0 {
            return Ok(PartitionAssignment::trivial(dir.slot_count()));
        }

        let owned: Vec<D::Entity> = dir.owned().collect();
        let mut xadj = Vec::with_capacity(owned.len() + 1);
        let mut adjncy = Vec::new();
        xadj.push(0);
        for &e in &owned {
            for n in dir.face_neighbors(e).flatten() {
                adjncy.push(index.index_of(dir.id(n))?);
            }
            xadj.push(adjncy.len());
        }

        let edge_counts = all_gather_u64(comm, adjncy.len() as u64, self.config.coordinator)?;
        if edge_counts.iter().all(|&c| c == 0) {
            log::debug!("repartition: dual graph has no edges");
            return Ok(PartitionAssignment::trivial(dir.slot_count()));
        }

        let graph = DistGraph {
            vtxdist: index.vtxdist().to_vec(),
            xadj,
            adjncy,
            vwgt: self
                .config
                .use_weights
                .then(|| owned.iter().map(|&e| dir.weight(e)).collect()),
        };
        let opts = RepartOptions {
            nparts,
            ubvec: self.config.imbalance_tolerance,
            itr,
            seed: self.config.rng_seed,
            coordinator: self.config.coordinator,
        };
        let out = self
            .library
            .adaptive_repart(&graph, &opts, comm)?
            .map_err(library_failure)?;
        log::debug!(
            "[rank {}] adaptive repartition (itr {itr}): cut {}",
            comm.rank(),
            out.edge_cut
        );
        self.scatter_to_slots(dir, &owned, out, nparts, PartitionMode::Adaptive)
    }

    fn check_coordinator(&self, size: usize) -> Result<(), MeshError> {
        if self.config.coordinator < size {
            Ok(())
        } else {
            Err(MeshError::RankOutOfRange {
                rank: self.config.coordinator,
                size,
            })
        }
    }

    // traversal order -> element slot; unowned slots stay 0
    fn scatter_to_slots<D>(
        &self,
        dir: &D,
        owned: &[D::Entity],
        out: LibraryOutput,
        nparts: usize,
        mode: PartitionMode,
    ) -> Result<PartitionAssignment, MeshError>
    where
        D: EntityDirectory + ?Sized,
    {
        if out.part.len() != owned.len() {
            return Err(MeshError::LengthMismatch {
                what: "partition result",
                expected: owned.len(),
                got: out.part.len(),
            });
        }
        let count = dir.slot_count();
        let mut targets = vec![0; count];
        for (&e, &p) in owned.iter().zip(&out.part) {
            if p >= nparts {
                return Err(library_failure(LibraryStatus::Error));
            }
            let slot = dir.slot(e);
            if slot >= count {
                return Err(MeshError::SlotOutOfRange { slot, count });
            }
            targets[slot] = p;
        }
        Ok(PartitionAssignment {
            targets,
            edge_cut: Some(out.edge_cut),
            mode,
        })
    }
}

fn library_failure(status: LibraryStatus) -> MeshError {
    MeshError::Partitioner {
        status,
        code: status.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::algs::distribute::distribute_mesh;
    use crate::algs::meshgen::structured_quads;

    #[test]
    fn single_rank_is_trivial() {
        let global = structured_quads(3, 2).unwrap();
        let local = distribute_mesh(&global, &vec![0; global.len()], 0, 0).unwrap();
        let bridge = PartitionerBridge::default();

        let init = bridge.initial_partition(&local, &NoComm).unwrap();
        assert_eq!(init.mode(), PartitionMode::Trivial);
        assert_eq!(init.targets(), &[0; 6]);

        let index = GlobalIndex::assign(&local, &NoComm).unwrap();
        let rep = bridge.repartition(&local, &index, &NoComm).unwrap();
        assert_eq!(rep.mode(), PartitionMode::Trivial);
        assert_eq!(rep.edge_cut(), None);
        assert_eq!(rep.migrating(&local, 0), 0);
    }

    #[test]
    fn bad_ratio_is_rejected() {
        let global = structured_quads(2, 2).unwrap();
        let local = distribute_mesh(&global, &vec![0; global.len()], 0, 0).unwrap();
        let index = GlobalIndex::assign(&local, &NoComm).unwrap();
        let err = PartitionerBridge::default()
            .repartition_with_ratio(&local, &index, &NoComm, -1.0)
            .unwrap_err();
        assert!(matches!(err, MeshError::InvalidConfig(_)));
    }

    #[test]
    fn coordinator_must_exist() {
        let config = PartitionerConfig {
            coordinator: 3,
            ..Default::default()
        };
        let bridge = PartitionerBridge::new(SerialLibrary::default(), config).unwrap();
        let global = structured_quads(2, 2).unwrap();
        let local = distribute_mesh(&global, &vec![0; global.len()], 0, 0).unwrap();
        let err = bridge.initial_partition(&local, &NoComm).unwrap_err();
        assert!(matches!(err, MeshError::RankOutOfRange { rank: 3, size: 1 }));
    }
}
