//! Value exchange between all copies of shared entities.
//!
//! Every process sends one record per (shared entity, remote copy) to the
//! rank holding that copy, and every neighbor receives exactly one message
//! (possibly empty) so the communication pattern is symmetric. What gets
//! sent and how received values are merged is up to the [`ExchangeHandle`].

use std::collections::{BTreeMap, BTreeSet};

use bytemuck::Pod;

use crate::algs::communicator::{CommTag, Communicator};
use crate::mesh_error::MeshError;
use crate::topology::directory::EntityDirectory;
use crate::topology::point::PointId;

/// Packs and merges the per-entity payload of [`exchange_shared`].
pub trait ExchangeHandle {
    type Payload: Pod;

    /// Value to send for the entity with sparse id `id`, or `None` to send nothing.
    fn gather(&self, id: PointId) -> Option<Self::Payload>;

    /// Merge a value received from rank `from` into the local copy of `id`.
    fn scatter(&mut self, id: PointId, from: usize, payload: Self::Payload)
    -> Result<(), MeshError>;
}

fn record_width<P: Pod>() -> usize {
    std::mem::size_of::<u64>() + std::mem::size_of::<P>()
}

/// Ranks that share at least one entity with this process.
pub fn neighbor_ranks<D: EntityDirectory + ?Sized>(dir: &D) -> BTreeSet<usize> {
    dir.entities().flat_map(|e| dir.copies(e)).collect()
}

/// Send each shared entity's payload to every remote copy and merge what
/// comes back. Collective over all ranks that share entities.
pub fn exchange_shared<D, C, H>(
    dir: &D,
    comm: &C,
    tag: CommTag,
    handle: &mut H,
) -> Result<(), MeshError>
where
    D: EntityDirectory + ?Sized,
    C: Communicator + ?Sized,
    H: ExchangeHandle,
{
    let me = comm.rank();
    let size = comm.size();
    let neighbors = neighbor_ranks(dir);
    if let Some(&bad) = neighbors.iter().find(|&&r| r >= size || r == me) {
        return Err(MeshError::RankOutOfRange { rank: bad, size });
    }

    let mut outgoing: BTreeMap<usize, Vec<u8>> =
        neighbors.iter().map(|&r| (r, Vec::new())).collect();
    for e in dir.entities() {
        let id = dir.id(e);
        let Some(payload) = handle.gather(id) else {
            continue;
        };
        for peer in dir.copies(e) {
            if let Some(buf) = outgoing.get_mut(&peer) {
                buf.extend_from_slice(&id.get().to_le_bytes());
                buf.extend_from_slice(bytemuck::bytes_of(&payload));
            }
        }
    }

    let received = comm.exchange(tag, &outgoing, &neighbors)?;
    log::trace!(
        "[rank {me}] shared exchange on tag {:#x}: {} neighbors",
        tag.as_u16(),
        neighbors.len()
    );

    let width = record_width::<H::Payload>();
    for (from, buf) in received {
        if buf.len() % width != 0 {
            return Err(MeshError::BufferSizeMismatch {
                neighbor: from,
                expected: width,
                got: buf.len(),
            });
        }
        for rec in buf.chunks_exact(width) {
            let (raw_id, raw_payload) = rec.split_at(std::mem::size_of::<u64>());
            let mut id_bytes = [0u8; 8];
            id_bytes.copy_from_slice(raw_id);
            let id = PointId::new(u64::from_le_bytes(id_bytes))?;
            if dir.lookup(id).is_none() {
                return Err(MeshError::UnknownEntity(id));
            }
            let payload: H::Payload = bytemuck::pod_read_unaligned(raw_payload);
            handle.scatter(id, from, payload)?;
        }
    }
    Ok(())
}
