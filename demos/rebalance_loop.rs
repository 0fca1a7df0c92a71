//! Four ranks (threads) follow a heavy "ball" moving across a 32×32 box of
//! quads: every round the element weights change, the mesh is repartitioned
//! adaptively, elements migrate, and the global numbering is rebuilt.
//!
//! Run with `RUST_LOG=debug cargo run --example rebalance_loop` for the
//! per-rank trace.

use std::sync::Arc;

use mesh_rebalance::algs::meshgen::structured_quads;
use mesh_rebalance::partitioning::{imbalance, migrated_weight};
use mesh_rebalance::prelude::*;

const NX: usize = 32;
const RANKS: usize = 4;
const ROUNDS: usize = 6;

fn ball_weight(pos: usize, round: usize) -> u32 {
    let (x, y) = ((pos % NX) as f64 + 0.5, (pos / NX) as f64 + 0.5);
    let cx = 4.0 + 24.0 * round as f64 / (ROUNDS - 1) as f64;
    let cy = NX as f64 / 2.0;
    if (x - cx).hypot(y - cy) < 6.0 { 10 } else { 1 }
}

fn run_rank(
    comm: ThreadComm,
    global: Arc<GlobalMesh>,
) -> Result<Vec<(f64, f64, u64)>, MeshError> {
    let config = PartitionerConfig {
        use_weights: true,
        ..Default::default()
    };
    let bridge = PartitionerBridge::new(SerialLibrary::from_config(&config), config)?;
    let mut mesh = ReplicatedMesh::on_coordinator(Arc::clone(&global), 0, comm.rank())?;

    let initial = bridge.initial_partition(mesh.local(), &comm)?;
    mesh.apply_partition(initial.targets(), 0, &comm)?;

    let mut history = Vec::new();
    for round in 0..ROUNDS {
        let weights: Vec<u32> = (0..global.len()).map(|p| ball_weight(p, round)).collect();
        for (pos, &w) in weights.iter().enumerate() {
            mesh.set_weight(pos, w)?;
        }
        let before = mesh.owners().to_vec();

        let index = GlobalIndex::assign(mesh.local(), &comm)?;
        let assignment = bridge.repartition(mesh.local(), &index, &comm)?;
        log::info!(
            "[rank {}] round {round}: {} of {} owned elements leave",
            comm.rank(),
            assignment.migrating(mesh.local(), comm.rank()),
            index.owned_count()
        );
        mesh.apply_partition(assignment.targets(), 0, &comm)?;

        history.push((
            imbalance(&before, &weights, RANKS),
            imbalance(mesh.owners(), &weights, RANKS),
            migrated_weight(mesh.owners(), &before, &weights),
        ));
    }
    Ok(history)
}

fn main() -> Result<(), MeshError> {
    env_logger::init();
    let global = Arc::new(structured_quads(NX, NX)?);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::world(RANKS)
            .into_iter()
            .map(|comm| {
                let global = Arc::clone(&global);
                s.spawn(move || run_rank(comm, global))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    });

    let mut history = Vec::new();
    for (rank, r) in results.into_iter().enumerate() {
        let h = r?;
        // the owner table is replicated, so every rank saw the same history
        if rank == 0 {
            history = h;
        }
    }
    for (round, (before, after, moved)) in history.into_iter().enumerate() {
        println!(
            "round {round}: imbalance {before:.3} -> {after:.3}, migrated weight {moved}"
        );
    }
    Ok(())
}
