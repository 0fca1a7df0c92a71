//! Balance and boundary refinement of a k-way partition.
//!
//! Both passes only ever move a vertex into a part it is already connected
//! to (except as a last resort when balancing), so parts stay compact.
//! With a [`Migration`] cost attached, refinement minimises
//! `itr * edge_cut + migrated_weight` instead of the plain cut.

use std::collections::BTreeSet;

use crate::algs::dual_graph::DualGraph;
use crate::partitioning::metrics::part_weights;

/// Current home part of every vertex plus the redistribution cost ratio.
#[derive(Debug, Clone, Copy)]
pub struct Migration<'a> {
    pub home: &'a [usize],
    pub itr: f64,
}

impl Migration<'_> {
    // change in migrated weight when `v` moves from part `from` to `to`
    fn delta(&self, v: usize, from: usize, to: usize, w: u64) -> f64 {
        let h = self.home[v];
        let before = if from != h { w } else { 0 };
        let after = if to != h { w } else { 0 };
        after as f64 - before as f64
    }
}

/// Heaviest part weight allowed for `total` weight in `nparts` parts.
pub fn max_part_weight(total: u64, nparts: usize, ubvec: f64, heaviest: u32) -> u64 {
    let nparts = nparts.max(1) as u64;
    let scaled = (total as f64 / nparts as f64 * ubvec).floor() as u64;
    scaled
        .max(total.div_ceil(nparts))
        .max(u64::from(heaviest))
}

/// Number of neighbours of `v` in each adjacent part, as `(part, count)`.
fn connectivity(graph: &DualGraph, part: &[usize], v: usize, out: &mut Vec<(usize, i64)>) {
    out.clear();
    for &u in graph.neighbors(v) {
        let p = part[u];
        match out.iter_mut().find(|(q, _)| *q == p) {
            Some((_, c)) => *c += 1,
            None => out.push((p, 1)),
        }
    }
}

fn conn_to(conn: &[(usize, i64)], p: usize) -> i64 {
    conn.iter().find(|(q, _)| *q == p).map_or(0, |&(_, c)| c)
}

/// Members of each part, with the subset that touches another part.
struct PartSets {
    members: Vec<BTreeSet<usize>>,
    boundary: Vec<BTreeSet<usize>>,
}

impl PartSets {
    fn new(graph: &DualGraph, part: &[usize], nparts: usize) -> Self {
        let mut sets = Self {
            members: vec![BTreeSet::new(); nparts],
            boundary: vec![BTreeSet::new(); nparts],
        };
        for v in 0..graph.len() {
            if let Some(m) = sets.members.get_mut(part[v]) {
                m.insert(v);
            }
            sets.touch(graph, part, v);
        }
        sets
    }

    // recompute whether `v` sits on the boundary of its part
    fn touch(&mut self, graph: &DualGraph, part: &[usize], v: usize) {
        let p = part[v];
        let Some(b) = self.boundary.get_mut(p) else {
            return;
        };
        let nparts = self.members.len();
        if graph
            .neighbors(v)
            .iter()
            .any(|&u| part[u] != p && part[u] < nparts)
        {
            b.insert(v);
        } else {
            b.remove(&v);
        }
    }

    fn relocate(&mut self, graph: &DualGraph, part: &[usize], v: usize, from: usize) {
        self.members[from].remove(&v);
        self.boundary[from].remove(&v);
        self.members[part[v]].insert(v);
        self.touch(graph, part, v);
        for &u in graph.neighbors(v) {
            self.touch(graph, part, u);
        }
    }
}

/// Move vertices out of parts heavier than `limit` until none is, or no
/// move is possible. Returns the number of moves.
///
/// Candidate moves are drawn from the overloaded part's boundary, so an
/// iteration costs time proportional to that boundary rather than to the
/// whole graph.
pub fn rebalance(graph: &DualGraph, part: &mut [usize], nparts: usize, limit: u64) -> usize {
    let mut loads = part_weights(part, &graph.vwgt, nparts);
    let mut sets = PartSets::new(graph, part, nparts);
    let mut conn = Vec::new();
    let mut moves = 0;
    for _ in 0..graph.len() * 2 {
        let Some(over) = (0..nparts)
            .filter(|&p| loads[p] > limit)
            .max_by_key(|&p| loads[p])
        else {
            break;
        };

        // best boundary move: (score, vertex, target)
        let mut best: Option<(i64, usize, usize)> = None;
        for &v in &sets.boundary[over] {
            let w = u64::from(graph.vwgt[v]);
            connectivity(graph, part, v, &mut conn);
            let internal = conn_to(&conn, over);
            for &(q, c) in &conn {
                if q == over || q >= nparts || loads[q] + w > limit {
                    continue;
                }
                let score = c - internal;
                let better = match best {
                    None => true,
                    Some((s, _, bq)) => score > s || (score == s && loads[q] < loads[bq]),
                };
                if better {
                    best = Some((score, v, q));
                }
            }
        }

        let chosen = best.map(|(_, v, q)| (v, q)).or_else(|| {
            // no adjacent part has room: ship the loosest vertex to the lightest part
            let lightest = (0..nparts).min_by_key(|&p| loads[p])?;
            sets.members[over]
                .iter()
                .copied()
                .filter(|&v| loads[lightest] + u64::from(graph.vwgt[v]) < loads[over])
                .min_by_key(|&v| {
                    connectivity(graph, part, v, &mut conn);
                    conn_to(&conn, over)
                })
                .map(|v| (v, lightest))
        });
        let Some((v, q)) = chosen else {
            break;
        };
        let w = u64::from(graph.vwgt[v]);
        loads[over] -= w;
        loads[q] += w;
        part[v] = q;
        sets.relocate(graph, part, v, over);
        moves += 1;
    }
    moves
}

/// Greedy boundary refinement. Each pass visits every vertex once and moves
/// it to the adjacent part with the largest positive benefit that keeps the
/// target under `limit`; zero-benefit moves are taken only if they improve
/// balance. Stops early when a pass moves nothing. Returns the number of moves.
pub fn refine(
    graph: &DualGraph,
    part: &mut [usize],
    nparts: usize,
    limit: u64,
    passes: usize,
    migration: Option<Migration<'_>>,
) -> usize {
    let mut loads = part_weights(part, &graph.vwgt, nparts);
    let mut conn = Vec::new();
    let mut total_moves = 0;
    for _ in 0..passes {
        let mut moved = 0;
        for v in 0..graph.len() {
            let from = part[v];
            let w = u64::from(graph.vwgt[v]);
            connectivity(graph, part, v, &mut conn);
            let internal = conn_to(&conn, from);

            let mut best: Option<(f64, usize)> = None;
            for &(q, c) in &conn {
                if q == from || q >= nparts || loads[q] + w > limit {
                    continue;
                }
                let gain = (c - internal) as f64;
                let benefit = match migration {
                    None => gain,
                    Some(m) => m.itr * gain - m.delta(v, from, q, w),
                };
                let improves_balance = from >= nparts || loads[q] + w < loads[from];
                if benefit < 0.0 || (benefit == 0.0 && !improves_balance) {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((b, bq)) => benefit > b || (benefit == b && loads[q] < loads[bq]),
                };
                if better {
                    best = Some((benefit, q));
                }
            }

            if let Some((_, q)) = best {
                if from < nparts {
                    loads[from] -= w;
                }
                loads[q] += w;
                part[v] = q;
                moved += 1;
            }
        }
        total_moves += moved;
        if moved == 0 {
            break;
        }
    }
    total_moves
}
