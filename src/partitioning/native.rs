//! Pure-Rust serial k-way engine.
//!
//! Greedy graph growing: parts are grown one after another by breadth-first
//! search from a peripheral seed until they reach their share of the total
//! weight, the last part takes the rest. The result is then balanced and
//! refined with [`refine`](crate::partitioning::refine).

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::algs::dual_graph::DualGraph;
use crate::partitioning::refine::{max_part_weight, rebalance, refine};
use crate::partitioning::seed_select::{UNASSIGNED, pick_seed};
use crate::partitioning::{KwayEngine, LibraryStatus, PartitionerConfig};

/// Greedy graph growing plus boundary refinement.
#[derive(Debug, Clone, Copy)]
pub struct NativeKway {
    pub refine_passes: usize,
}

impl Default for NativeKway {
    fn default() -> Self {
        Self { refine_passes: 8 }
    }
}

impl NativeKway {
    pub fn from_config(cfg: &PartitionerConfig) -> Self {
        Self {
            refine_passes: cfg.refine_passes,
        }
    }
}

impl KwayEngine for NativeKway {
    fn part_graph_kway(
        &self,
        graph: &DualGraph,
        nparts: usize,
        ubvec: f64,
        seed: u64,
    ) -> Result<Vec<usize>, LibraryStatus> {
        if nparts == 0 || ubvec.is_nan() || ubvec < 1.0 {
            return Err(LibraryStatus::InputError);
        }
        graph.validate().map_err(|_| LibraryStatus::InputError)?;
        if nparts == 1 || graph.is_empty() {
            return Ok(vec![0; graph.len()]);
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        let mut part = grow(graph, nparts, &mut rng);

        let heaviest = graph.vwgt.iter().copied().max().unwrap_or(0);
        let limit = max_part_weight(graph.total_weight(), nparts, ubvec, heaviest);
        let balanced = rebalance(graph, &mut part, nparts, limit);
        let refined = refine(graph, &mut part, nparts, limit, self.refine_passes, None);
        log::trace!(
            "native k-way: {} vertices, {nparts} parts, {balanced} balance moves, {refined} refinement moves",
            graph.len()
        );
        Ok(part)
    }
}

fn grow(graph: &DualGraph, nparts: usize, rng: &mut SmallRng) -> Vec<usize> {
    let total = graph.total_weight();
    let mut part = vec![UNASSIGNED; graph.len()];
    let mut assigned = 0u64;
    for p in 0..nparts - 1 {
        let target = (total - assigned).div_ceil((nparts - p) as u64);
        let mut load = 0u64;
        let mut queue = VecDeque::new();
        while load < target {
            let v = match queue.pop_front() {
                Some(v) if part[v] == UNASSIGNED => v,
                Some(_) => continue,
                None => match pick_seed(graph, &part, rng) {
                    Some(s) => s,
                    None => break,
                },
            };
            part[v] = p;
            load += u64::from(graph.vwgt[v]);
            queue.extend(
                graph
                    .neighbors(v)
                    .iter()
                    .copied()
                    .filter(|&u| part[u] == UNASSIGNED),
            );
        }
        assigned += load;
    }
    for x in part.iter_mut().filter(|x| **x == UNASSIGNED) {
        *x = nparts - 1;
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioning::metrics::{edge_cut, imbalance};

    fn grid(nx: usize, ny: usize) -> DualGraph {
        let idx = |i: usize, j: usize| j * nx + i;
        let mut adj = vec![Vec::new(); nx * ny];
        for j in 0..ny {
            for i in 0..nx {
                if i + 1 < nx {
                    adj[idx(i, j)].push(idx(i + 1, j));
                    adj[idx(i + 1, j)].push(idx(i, j));
                }
                if j + 1 < ny {
                    adj[idx(i, j)].push(idx(i, j + 1));
                    adj[idx(i, j + 1)].push(idx(i, j));
                }
            }
        }
        DualGraph::from_adjacency(&adj)
    }

    #[test]
    fn balanced_four_way_split_of_a_grid() {
        let g = grid(10, 10);
        let part = NativeKway::default()
            .part_graph_kway(&g, 4, 1.05, 42)
            .unwrap();
        assert!(part.iter().all(|&p| p < 4));
        assert!(imbalance(&part, &g.vwgt, 4) <= 1.05 + 1e-9);
        // a random assignment cuts about 135 of the 180 edges
        assert!(edge_cut(&g, &part) < 60, "cut {}", edge_cut(&g, &part));
    }

    #[test]
    fn deterministic_for_a_seed() {
        let g = grid(8, 5);
        let engine = NativeKway::default();
        let a = engine.part_graph_kway(&g, 3, 1.05, 7).unwrap();
        let b = engine.part_graph_kway(&g, 3, 1.05, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn more_parts_than_vertices() {
        let g = grid(2, 1);
        let part = NativeKway::default()
            .part_graph_kway(&g, 5, 1.05, 1)
            .unwrap();
        assert_eq!(part.len(), 2);
        assert!(part.iter().all(|&p| p < 5));
    }

    #[test]
    fn zero_parts_is_an_input_error() {
        let g = grid(2, 2);
        assert_eq!(
            NativeKway::default().part_graph_kway(&g, 0, 1.05, 1),
            Err(LibraryStatus::InputError)
        );
    }
}
