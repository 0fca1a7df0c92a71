//! Partitioning metrics utilities.
//!
//! Edge cut, part loads, imbalance and migration volume of a partitioning.
//! Used by the shipped libraries to pick between candidates and by tests
//! to check the quality of a result.

use crate::algs::dual_graph::DualGraph;

/// Computes the edge cut of a partitioning (O(E)).
///
/// Every undirected edge whose endpoints lie in different parts counts once.
pub fn edge_cut(graph: &DualGraph, part: &[usize]) -> u64 {
    let crossing: usize = (0..graph.len())
        .map(|v| {
            graph
                .neighbors(v)
                .iter()
                .filter(|&&u| part[u] != part[v])
                .count()
        })
        .sum();
    (crossing / 2) as u64
}

/// Total vertex weight of each part.
pub fn part_weights(part: &[usize], vwgt: &[u32], nparts: usize) -> Vec<u64> {
    let mut loads = vec![0u64; nparts];
    for (&p, &w) in part.iter().zip(vwgt) {
        if p < nparts {
            loads[p] += u64::from(w);
        }
    }
    loads
}

/// Heaviest part relative to the average part (1.0 is perfect balance).
pub fn imbalance(part: &[usize], vwgt: &[u32], nparts: usize) -> f64 {
    if nparts == 0 {
        return 0.0;
    }
    let loads = part_weights(part, vwgt, nparts);
    let total: u64 = loads.iter().sum();
    if total == 0 {
        return 1.0;
    }
    let avg = total as f64 / nparts as f64;
    loads.iter().copied().max().unwrap_or(0) as f64 / avg
}

/// Weight of the vertices whose part differs from their current home.
pub fn migrated_weight(part: &[usize], home: &[usize], vwgt: &[u32]) -> u64 {
    part.iter()
        .zip(home)
        .zip(vwgt)
        .filter(|((p, h), _)| p != h)
        .map(|(_, &w)| u64::from(w))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path4() -> DualGraph {
        DualGraph::from_adjacency(&[vec![1], vec![0, 2], vec![1, 3], vec![2]])
    }

    #[test]
    fn cut_of_a_path() {
        let g = path4();
        assert_eq!(edge_cut(&g, &[0, 0, 1, 1]), 1);
        assert_eq!(edge_cut(&g, &[0, 1, 0, 1]), 3);
        assert_eq!(edge_cut(&g, &[2, 2, 2, 2]), 0);
    }

    #[test]
    fn loads_and_imbalance() {
        let w = [4, 7, 5, 2];
        assert_eq!(part_weights(&[0, 0, 1, 1], &w, 2), vec![11, 7]);
        let ib = imbalance(&[0, 0, 1, 1], &w, 2);
        assert!((ib - 11.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn migration_volume() {
        assert_eq!(migrated_weight(&[0, 1, 1], &[0, 0, 1], &[3, 5, 7]), 5);
    }
}
