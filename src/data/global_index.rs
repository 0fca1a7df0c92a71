//! Dense global numbering of distributed mesh elements.
//!
//! [`GlobalIndex::assign`] gives every element of a partitioned mesh an
//! integer in `[0, N)`, where `N` is the number of elements across all
//! processes. Owned elements are numbered rank by rank (ascending) and, within
//! a rank, in the directory's traversal order. Replicas learn the index of
//! their element from the owner through one exchange over the shared-entity
//! interface.
//!
//! The table is valid for a single directory epoch. Any migration, refinement
//! or coarsening invalidates it; [`GlobalIndex::ensure_current`] detects that.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::algs::communicator::{CommTag, Communicator, all_gather_u64};
use crate::algs::completion::{ExchangeHandle, exchange_shared};
use crate::mesh_error::MeshError;
use crate::topology::directory::EntityDirectory;
use crate::topology::point::PointId;

/// Index held by a replica before the owner's value has arrived.
pub const UNRESOLVED: i64 = -1;

/// Rank that collects the owned counts.
const COUNT_ROOT: usize = 0;

/// Sparse id → dense global index for every local element, plus the offset
/// table shared by all processes.
#[derive(Clone, Debug)]
pub struct GlobalIndex {
    table: BTreeMap<PointId, u64>,
    vtxdist: Vec<u64>,
    rank: usize,
    epoch: u64,
}

impl GlobalIndex {
    /// Compute the numbering. Collective: every rank of `comm` must call it.
    ///
    /// The outcome is agreed on collectively: if any rank fails to resolve
    /// its table, that rank returns its own error and every other rank
    /// returns [`MeshError::RemoteFailure`]. A communication failure can
    /// still leave peers waiting.
    pub fn assign<D, C>(dir: &D, comm: &C) -> Result<Self, MeshError>
    where
        D: EntityDirectory + ?Sized,
        C: Communicator + ?Sized,
    {
        Self::assign_with_tag(dir, comm, CommTag::INDEX_EXCHANGE)
    }

    /// As [`assign`](Self::assign), with an explicit tag for the resolution exchange.
    pub fn assign_with_tag<D, C>(dir: &D, comm: &C, tag: CommTag) -> Result<Self, MeshError>
    where
        D: EntityDirectory + ?Sized,
        C: Communicator + ?Sized,
    {
        let rank = comm.rank();
        let owned = dir.owned().count() as u64;

        let counts = all_gather_u64(comm, owned, COUNT_ROOT)?;
        let mut vtxdist = Vec::with_capacity(counts.len() + 1);
        let mut running = 0u64;
        vtxdist.push(0);
        for c in &counts {
            running += c;
            vtxdist.push(running);
        }
        log::debug!("[rank {rank}] owned {owned}, offsets {:?}", &vtxdist[..counts.len()]);

        // Local failures are held back until every rank has agreed on the
        // outcome, so no rank keeps a table another rank rejected.
        let mut failure = None;
        let mut table: BTreeMap<PointId, i64> = BTreeMap::new();
        let mut next = vtxdist[rank] as i64;
        for e in dir.entities() {
            let value = if dir.role(e).is_owned() {
                next += 1;
                next - 1
            } else {
                UNRESOLVED
            };
            if table.insert(dir.id(e), value).is_some() && failure.is_none() {
                failure = Some(MeshError::DuplicateEntity(dir.id(e)));
            }
        }

        if comm.size() > 1 {
            let mut handle = IndexExchange {
                table: &mut table,
                rank,
            };
            if let Err(err) = exchange_shared(dir, comm, tag, &mut handle) {
                failure.get_or_insert(err);
            }
        }

        let resolved = match failure {
            Some(err) => Err(err),
            None => resolve(table, rank),
        };
        let failed = all_gather_u64(comm, u64::from(resolved.is_err()), COUNT_ROOT)?;
        let resolved = resolved?;
        if let Some(bad) = failed.iter().position(|&f| f != 0) {
            log::debug!("[rank {rank}] index assignment aborted by rank {bad}");
            return Err(MeshError::RemoteFailure { rank: bad });
        }

        Ok(Self {
            table: resolved,
            vtxdist,
            rank,
            epoch: dir.epoch(),
        })
    }

    /// Dense index of the element with sparse id `id`.
    pub fn index_of(&self, id: PointId) -> Result<u64, MeshError> {
        self.table
            .get(&id)
            .copied()
            .ok_or(MeshError::UnknownEntity(id))
    }

    /// Dense index of a local element; fails if `dir` has moved on since the
    /// index was computed.
    pub fn global_index<D>(&self, dir: &D, e: D::Entity) -> Result<u64, MeshError>
    where
        D: EntityDirectory + ?Sized,
    {
        self.ensure_current(dir)?;
        self.index_of(dir.id(e))
    }

    /// Err with [`MeshError::StaleIndex`] unless `dir` is at the epoch this
    /// index was computed for.
    pub fn ensure_current<D>(&self, dir: &D) -> Result<(), MeshError>
    where
        D: EntityDirectory + ?Sized,
    {
        if dir.epoch() == self.epoch {
            Ok(())
        } else {
            Err(MeshError::StaleIndex {
                computed: self.epoch,
                current: dir.epoch(),
            })
        }
    }

    /// Global number of elements.
    pub fn total(&self) -> u64 {
        self.vtxdist.last().copied().unwrap_or(0)
    }

    /// Number of elements owned by this rank.
    pub fn owned_count(&self) -> u64 {
        self.vtxdist[self.rank + 1] - self.vtxdist[self.rank]
    }

    /// First dense index of every rank (length P).
    pub fn offsets(&self) -> &[u64] {
        &self.vtxdist[..self.vtxdist.len() - 1]
    }

    /// Offsets followed by the total (length P + 1), the vertex distribution
    /// of the dual graph.
    pub fn vtxdist(&self) -> &[u64] {
        &self.vtxdist
    }

    /// Dense indices owned by this rank.
    pub fn owned_range(&self) -> Range<u64> {
        self.vtxdist[self.rank]..self.vtxdist[self.rank + 1]
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of local elements (owned and replicas).
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// `(sparse id, dense index)` pairs, ascending by sparse id.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, u64)> + '_ {
        self.table.iter().map(|(&id, &index)| (id, index))
    }
}

fn resolve(table: BTreeMap<PointId, i64>, rank: usize) -> Result<BTreeMap<PointId, u64>, MeshError> {
    table
        .into_iter()
        .map(|(id, value)| {
            u64::try_from(value)
                .map(|index| (id, index))
                .map_err(|_| MeshError::UnresolvedIndex { id, rank })
        })
        .collect()
}

/// Sends every local value (sentinels included) and adopts the non-negative ones.
struct IndexExchange<'a> {
    table: &'a mut BTreeMap<PointId, i64>,
    rank: usize,
}

impl ExchangeHandle for IndexExchange<'_> {
    type Payload = i64;

    fn gather(&self, id: PointId) -> Option<i64> {
        self.table.get(&id).copied()
    }

    fn scatter(&mut self, id: PointId, from: usize, received: i64) -> Result<(), MeshError> {
        if received < 0 {
            return Ok(());
        }
        let local = self.table.get_mut(&id).ok_or(MeshError::UnknownEntity(id))?;
        if *local >= 0 && *local != received {
            return Err(MeshError::ConflictingIndex {
                id,
                rank: self.rank,
                from,
                local: *local,
                received,
            });
        }
        *local = received;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::topology::cell_type::CellType;
    use crate::topology::local_mesh::{ElementRecord, LocalMesh};
    use crate::topology::ownership::PartitionRole;

    fn segment(raw: u64, role: PartitionRole, copies: Vec<usize>) -> ElementRecord {
        ElementRecord {
            id: PointId::new(raw).unwrap(),
            role,
            cell_type: CellType::Segment,
            vertices: vec![0, 1],
            faces: vec![None, None],
            copies,
            weight: 1,
        }
    }

    #[test]
    fn single_rank_numbers_in_traversal_order() {
        let mesh = LocalMesh::from_records(
            0,
            3,
            vec![
                segment(90, PartitionRole::Owned, vec![]),
                segment(12, PartitionRole::Owned, vec![]),
                segment(55, PartitionRole::Owned, vec![]),
            ],
        )
        .unwrap();
        let gi = GlobalIndex::assign(&mesh, &NoComm).unwrap();
        assert_eq!(gi.index_of(PointId::new(90).unwrap()).unwrap(), 0);
        assert_eq!(gi.index_of(PointId::new(12).unwrap()).unwrap(), 1);
        assert_eq!(gi.index_of(PointId::new(55).unwrap()).unwrap(), 2);
        assert_eq!(gi.offsets(), &[0]);
        assert_eq!(gi.vtxdist(), &[0, 3]);
        assert_eq!(gi.owned_range(), 0..3);
        assert_eq!(gi.epoch(), 3);
        let ids: Vec<u64> = gi.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, vec![12, 55, 90]);
    }

    #[test]
    fn replica_without_owner_is_unresolved() {
        let mesh = LocalMesh::from_records(
            0,
            0,
            vec![
                segment(1, PartitionRole::Owned, vec![]),
                segment(2, PartitionRole::Ghost, vec![]),
            ],
        )
        .unwrap();
        let err = GlobalIndex::assign(&mesh, &NoComm).unwrap_err();
        assert!(matches!(err, MeshError::UnresolvedIndex { rank: 0, id } if id.get() == 2));
    }

    #[test]
    fn absent_entity_is_reported() {
        let mesh =
            LocalMesh::from_records(0, 0, vec![segment(4, PartitionRole::Owned, vec![])]).unwrap();
        let gi = GlobalIndex::assign(&mesh, &NoComm).unwrap();
        let missing = PointId::new(5).unwrap();
        assert!(matches!(gi.index_of(missing), Err(MeshError::UnknownEntity(p)) if p == missing));
    }

    #[test]
    fn second_owner_is_a_conflict() {
        let mut table = BTreeMap::from([(PointId::new(8).unwrap(), 4i64)]);
        let mut handle = IndexExchange {
            table: &mut table,
            rank: 1,
        };
        let id = PointId::new(8).unwrap();
        handle.scatter(id, 0, UNRESOLVED).unwrap();
        handle.scatter(id, 0, 4).unwrap();
        let err = handle.scatter(id, 2, 6).unwrap_err();
        assert!(matches!(
            err,
            MeshError::ConflictingIndex { from: 2, local: 4, received: 6, .. }
        ));
    }

    #[test]
    fn empty_directory_has_zero_total() {
        let mesh = LocalMesh::from_records(0, 0, vec![]).unwrap();
        let gi = GlobalIndex::assign(&mesh, &NoComm).unwrap();
        assert_eq!(gi.total(), 0);
        assert!(gi.is_empty());
    }
}
