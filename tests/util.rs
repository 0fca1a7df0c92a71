#![allow(dead_code)]
use std::sync::Arc;

use mesh_rebalance::prelude::*;

pub fn pid(u: u64) -> PointId {
    PointId::new(u).unwrap()
}

/// Run `f` on `size` ranks, one thread each, and collect the results by rank.
pub fn run_ranks<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(ThreadComm) -> R + Sync,
    R: Send,
{
    let comms = ThreadComm::world(size);
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank panicked"))
            .collect()
    })
}

/// Owner table assigning contiguous blocks of global positions to ranks.
pub fn block_owners(n: usize, size: usize) -> Vec<usize> {
    (0..n).map(|pos| pos * size / n.max(1)).collect()
}

/// Owner table dealing positions out round-robin (maximally fragmented).
pub fn round_robin_owners(n: usize, size: usize) -> Vec<usize> {
    (0..n).map(|pos| pos % size).collect()
}

pub fn replicated(global: &Arc<GlobalMesh>, owners: &[usize], rank: usize) -> ReplicatedMesh {
    ReplicatedMesh::new(Arc::clone(global), owners.to_vec(), rank).unwrap()
}

/// Dual-graph edge cut of an owner table, counted on the global mesh.
pub fn global_cut(global: &GlobalMesh, owners: &[usize]) -> usize {
    (0..global.len())
        .map(|p| {
            global
                .neighbors(p)
                .iter()
                .flatten()
                .filter(|&&n| owners[n] != owners[p])
                .count()
        })
        .sum::<usize>()
        / 2
}

/// Owner table after applying the owned part of each rank's assignment.
pub fn owners_after(global: &GlobalMesh, meshes: &[(LocalMesh, Vec<usize>)]) -> Vec<usize> {
    let mut owners = vec![usize::MAX; global.len()];
    for (mesh, targets) in meshes {
        for e in mesh.owned() {
            let pos = global.position(mesh.id(e)).unwrap();
            owners[pos] = targets[mesh.slot(e)];
        }
    }
    owners
}
