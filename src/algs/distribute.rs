//! Building per-rank views of a mesh and moving elements between ranks.
//!
//! [`distribute_mesh`] cuts one rank's [`LocalMesh`] out of a [`GlobalMesh`]
//! given an owner per element: the owned elements plus one layer of ghosts
//! across their faces. [`ReplicatedMesh`] keeps the global mesh on every
//! rank and implements [`LoadBalance`] by rebuilding that view after the
//! owner table changes. It stands in for a real distributed mesh's
//! migration in tests and demos.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use itertools::Itertools;

use crate::algs::communicator::Communicator;
use crate::algs::wire::{WireTarget, cast_slice, decode_records, decode_u64s, encode_u64s};
use crate::mesh_error::MeshError;
use crate::topology::directory::EntityDirectory;
use crate::topology::local_mesh::{ElementRecord, GlobalMesh, LocalMesh};
use crate::topology::ownership::PartitionRole;
use crate::topology::point::PointId;

/// Build `rank`'s view of `global` for the owner table `owners`.
///
/// Local traversal order is ascending global position. An element's copy
/// list names every other rank that holds it: its owner and the owners of
/// its face neighbours.
pub fn distribute_mesh(
    global: &GlobalMesh,
    owners: &[usize],
    rank: usize,
    epoch: u64,
) -> Result<LocalMesh, MeshError> {
    if owners.len() != global.len() {
        return Err(MeshError::LengthMismatch {
            what: "owner table",
            expected: global.len(),
            got: owners.len(),
        });
    }

    let mut present = BTreeSet::new();
    for pos in (0..global.len()).filter(|&p| owners[p] == rank) {
        present.insert(pos);
        present.extend(global.neighbors(pos).iter().flatten().copied());
    }
    let local_pos: HashMap<usize, usize> = present
        .iter()
        .enumerate()
        .map(|(local, &pos)| (pos, local))
        .collect();

    let mut vertex_map: HashMap<usize, usize> = HashMap::new();
    let mut records = Vec::with_capacity(present.len());
    for &pos in &present {
        let copies: Vec<usize> = std::iter::once(owners[pos])
            .chain(global.neighbors(pos).iter().flatten().map(|&n| owners[n]))
            .filter(|&r| r != rank)
            .sorted_unstable()
            .dedup()
            .collect();
        let vertices = global
            .cell_vertices(pos)
            .iter()
            .map(|&v| {
                let next = vertex_map.len();
                *vertex_map.entry(v).or_insert(next)
            })
            .collect();
        records.push(ElementRecord {
            id: global.id(pos),
            role: PartitionRole::from_owner(owners[pos], rank),
            cell_type: global.cell_type(pos),
            vertices,
            faces: global
                .neighbors(pos)
                .iter()
                .map(|n| n.and_then(|n| local_pos.get(&n).copied()))
                .collect(),
            copies,
            weight: 1,
        });
    }
    LocalMesh::from_records(rank, epoch, records)
}

/// Moves elements to the ranks a partition assignment names.
pub trait LoadBalance {
    /// Apply `targets` (indexed by element slot; only owned slots are read).
    /// Collective. Bumps the directory epoch, invalidating every index
    /// computed before.
    fn apply_partition<C>(
        &mut self,
        targets: &[usize],
        coordinator: usize,
        comm: &C,
    ) -> Result<(), MeshError>
    where
        C: Communicator + ?Sized;
}

/// A mesh replicated on every rank, distributed by an owner table.
#[derive(Debug, Clone)]
pub struct ReplicatedMesh {
    global: Arc<GlobalMesh>,
    owners: Vec<usize>,
    weights: Vec<u32>,
    local: LocalMesh,
    rank: usize,
}

impl ReplicatedMesh {
    pub fn new(global: Arc<GlobalMesh>, owners: Vec<usize>, rank: usize) -> Result<Self, MeshError> {
        let local = distribute_mesh(&global, &owners, rank, 0)?;
        let weights = vec![1; global.len()];
        Ok(Self {
            global,
            owners,
            weights,
            local,
            rank,
        })
    }

    /// Every element owned by `coordinator`; the state before the initial partition.
    pub fn on_coordinator(
        global: Arc<GlobalMesh>,
        coordinator: usize,
        rank: usize,
    ) -> Result<Self, MeshError> {
        let owners = vec![coordinator; global.len()];
        Self::new(global, owners, rank)
    }

    pub fn local(&self) -> &LocalMesh {
        &self.local
    }

    pub fn global(&self) -> &GlobalMesh {
        &self.global
    }

    /// Owner of every element, by global position.
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn epoch(&self) -> u64 {
        self.local.epoch()
    }

    /// Set the computational weight of the element at global position `pos`.
    ///
    /// Weights are replicated: every rank must set the same values.
    pub fn set_weight(&mut self, pos: usize, weight: u32) -> Result<(), MeshError> {
        let slot = self.weights.get_mut(pos).ok_or(MeshError::LengthMismatch {
            what: "element position",
            expected: self.global.len(),
            got: pos,
        })?;
        *slot = weight;
        let id = self.global.id(pos);
        if self.local.lookup(id).is_some() {
            self.local.set_weight(id, weight)?;
        }
        Ok(())
    }

    fn rebuild(&mut self, epoch: u64) -> Result<(), MeshError> {
        let mut local = distribute_mesh(&self.global, &self.owners, self.rank, epoch)?;
        for e in 0..local.len() {
            let id = local.id(e);
            if let Some(pos) = self.global.position(id) {
                local.set_weight(id, self.weights[pos])?;
            }
        }
        self.local = local;
        Ok(())
    }
}

impl LoadBalance for ReplicatedMesh {
    fn apply_partition<C>(
        &mut self,
        targets: &[usize],
        coordinator: usize,
        comm: &C,
    ) -> Result<(), MeshError>
    where
        C: Communicator + ?Sized,
    {
        let size = comm.size();
        if targets.len() != self.local.slot_count() {
            return Err(MeshError::LengthMismatch {
                what: "partition targets",
                expected: self.local.slot_count(),
                got: targets.len(),
            });
        }

        let mut moves = Vec::new();
        for e in self.local.owned() {
            let part = targets[self.local.slot(e)];
            if part >= size {
                return Err(MeshError::RankOutOfRange { rank: part, size });
            }
            moves.push(WireTarget::new(self.local.id(e).get(), part));
        }

        let gathered = comm.gather(cast_slice(&moves), coordinator)?;
        let mut table = Vec::new();
        if let Some(parts) = gathered {
            let mut owners = self.owners.clone();
            for (from, buf) in parts.iter().enumerate() {
                for rec in decode_records::<WireTarget>(from, buf)? {
                    let id = PointId::new(rec.id())?;
                    let pos = self
                        .global
                        .position(id)
                        .ok_or(MeshError::UnknownEntity(id))?;
                    owners[pos] = rec.part();
                }
            }
            table = encode_u64s(owners.iter().map(|&o| o as u64));
        }
        comm.broadcast(&mut table, coordinator)?;

        let owners: Vec<usize> = decode_u64s(coordinator, &table)?
            .into_iter()
            .map(|o| o as usize)
            .collect();
        if owners.len() != self.global.len() {
            return Err(MeshError::LengthMismatch {
                what: "owner table",
                expected: self.global.len(),
                got: owners.len(),
            });
        }
        let moved = owners
            .iter()
            .zip(&self.owners)
            .filter(|(new, old)| new != old)
            .count();
        self.owners = owners;
        let epoch = self.local.epoch() + 1;
        self.rebuild(epoch)?;
        log::debug!(
            "[rank {}] load balance: {moved} elements moved, epoch {epoch}, {} owned",
            self.rank,
            self.local.owned_count()
        );
        Ok(())
    }
}
