//! Partitioning library built on a serial k-way engine.
//!
//! The mesh partition runs the engine on the dual graph directly. The
//! adaptive repartition gathers the distributed graph on one rank, evaluates
//! two candidates and sends every rank its slice of the winner:
//!
//! * *diffusion*: start from the current distribution, move vertices out of
//!   overloaded parts, then refine;
//! * *scratch-remap*: partition from scratch, relabel the parts to overlap
//!   the current distribution as much as possible, then refine.
//!
//! The winner minimises `itr * edge_cut + migrated_weight`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use bytes::Bytes;

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::dual_graph::{DualGraph, mesh_to_dual, validate_csr};
use crate::algs::wire::{decode_u64s, encode_u64s};
use crate::mesh_error::MeshError;
use crate::partitioning::metrics::{edge_cut, migrated_weight};
use crate::partitioning::refine::{Migration, max_part_weight, rebalance, refine};
use crate::partitioning::{
    DistGraph, KwayEngine, KwayOptions, LibraryOutput, LibraryStatus, MeshInput, NativeKway,
    PartitionLibrary, PartitionerConfig, RepartOptions,
};

// header words of a gathered graph slice
const SLICE_INVALID: u64 = 0;
const SLICE_VALID: u64 = 1;

/// [`PartitionLibrary`] on top of a serial [`KwayEngine`].
#[derive(Debug, Clone)]
pub struct SerialLibrary<E = NativeKway> {
    engine: E,
    refine_passes: usize,
}

impl<E: KwayEngine> SerialLibrary<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            refine_passes: 8,
        }
    }

    pub fn with_refine_passes(mut self, passes: usize) -> Self {
        self.refine_passes = passes;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl SerialLibrary<NativeKway> {
    pub fn from_config(cfg: &PartitionerConfig) -> Self {
        Self::new(NativeKway::from_config(cfg)).with_refine_passes(cfg.refine_passes)
    }
}

impl Default for SerialLibrary<NativeKway> {
    fn default() -> Self {
        Self::new(NativeKway::default())
    }
}

impl<E: KwayEngine> PartitionLibrary for SerialLibrary<E> {
    fn part_mesh_kway(
        &self,
        mesh: &MeshInput,
        opts: &KwayOptions,
    ) -> Result<LibraryOutput, LibraryStatus> {
        if opts.nparts == 0 {
            return Err(LibraryStatus::InputError);
        }
        let graph = mesh_to_dual(
            &mesh.eptr,
            &mesh.eind,
            opts.ncommon,
            mesh.weights.as_deref(),
        )
        .map_err(|_| LibraryStatus::InputError)?;
        let part = self
            .engine
            .part_graph_kway(&graph, opts.nparts, opts.ubvec, opts.seed)?;
        Ok(LibraryOutput {
            edge_cut: edge_cut(&graph, &part),
            part,
        })
    }

    fn adaptive_repart<C: Communicator + ?Sized>(
        &self,
        graph: &DistGraph,
        opts: &RepartOptions,
        comm: &C,
    ) -> Result<Result<LibraryOutput, LibraryStatus>, MeshError> {
        let (rank, size) = (comm.rank(), comm.size());
        let root = opts.coordinator;
        if root >= size {
            return Err(MeshError::RankOutOfRange { rank: root, size });
        }

        let slice = encode_slice(graph, rank, size);
        let Some(slices) = comm.gather(&slice, root)? else {
            let mut received = comm.exchange(
                CommTag::REPARTITION,
                &BTreeMap::new(),
                &BTreeSet::from([root]),
            )?;
            let reply = received
                .remove(&root)
                .ok_or_else(|| MeshError::comm(root, "missing repartition result"))?;
            return decode_reply(root, &reply);
        };

        let outcome = self.solve(&graph.vtxdist, &slices, opts);
        let mut replies: BTreeMap<usize, Vec<u8>> = (0..size)
            .map(|r| (r, encode_reply(&outcome, &graph.vtxdist, r)))
            .collect();
        let own = replies.remove(&rank).unwrap_or_default();
        comm.exchange(CommTag::REPARTITION, &replies, &BTreeSet::new())?;
        decode_reply(rank, &own)
    }
}

impl<E: KwayEngine> SerialLibrary<E> {
    fn solve(
        &self,
        vtxdist: &[u64],
        slices: &[Bytes],
        opts: &RepartOptions,
    ) -> Result<LibraryOutput, LibraryStatus> {
        let nparts = opts.nparts;
        if nparts == 0
            || opts.ubvec.is_nan()
            || opts.ubvec < 1.0
            || !opts.itr.is_finite()
            || opts.itr <= 0.0
        {
            return Err(LibraryStatus::InputError);
        }
        let (graph, home) = assemble(vtxdist, slices)?;
        let heaviest = graph.vwgt.iter().copied().max().unwrap_or(0);
        let limit = max_part_weight(graph.total_weight(), nparts, opts.ubvec, heaviest);
        let mig = Migration {
            home: &home,
            itr: opts.itr,
        };

        let mut diffusion: Vec<usize> = home.iter().map(|&h| h % nparts).collect();
        rebalance(&graph, &mut diffusion, nparts, limit);
        refine(&graph, &mut diffusion, nparts, limit, self.refine_passes, Some(mig));

        let mut scratch = self
            .engine
            .part_graph_kway(&graph, nparts, opts.ubvec, opts.seed)?;
        remap_to_home(&mut scratch, &home, &graph.vwgt, nparts);
        refine(&graph, &mut scratch, nparts, limit, self.refine_passes, Some(mig));

        let cost = |part: &[usize]| {
            opts.itr * edge_cut(&graph, part) as f64
                + migrated_weight(part, &home, &graph.vwgt) as f64
        };
        let (c_diff, c_scratch) = (cost(&diffusion), cost(&scratch));
        let part = if c_scratch < c_diff {
            scratch
        } else {
            diffusion
        };
        log::debug!(
            "adaptive repartition of {} vertices: diffusion cost {c_diff}, scratch-remap cost {c_scratch}",
            graph.len()
        );
        Ok(LibraryOutput {
            edge_cut: edge_cut(&graph, &part),
            part,
        })
    }
}

fn encode_slice(graph: &DistGraph, rank: usize, size: usize) -> Vec<u8> {
    let vtxdist = &graph.vtxdist;
    let n = graph.local_len();
    let valid = vtxdist.len() == size + 1
        && vtxdist.windows(2).all(|w| w[0] <= w[1])
        && (vtxdist[rank + 1] - vtxdist[rank]) as usize == n
        && graph.xadj.len() == n + 1
        && validate_csr(&graph.xadj, &graph.adjncy, vtxdist[size]).is_ok()
        && graph.vwgt.as_ref().is_none_or(|w| w.len() == n);
    if !valid {
        return encode_u64s([SLICE_INVALID]);
    }
    let header = [SLICE_VALID, n as u64, u64::from(graph.vwgt.is_some())];
    encode_u64s(
        header
            .into_iter()
            .chain(graph.xadj.iter().map(|&x| x as u64))
            .chain(graph.adjncy.iter().copied())
            .chain(graph.vwgt.iter().flatten().map(|&w| u64::from(w))),
    )
}

/// Rebuild the global graph from the gathered slices. Edges are symmetrised;
/// `home[v]` is the rank that contributed `v`.
fn assemble(vtxdist: &[u64], slices: &[Bytes]) -> Result<(DualGraph, Vec<usize>), LibraryStatus> {
    let size = slices.len();
    if vtxdist.len() != size + 1 || vtxdist.windows(2).any(|w| w[1] < w[0]) {
        return Err(LibraryStatus::InputError);
    }
    let n_total = vtxdist[size] as usize;
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n_total];
    let mut vwgt = vec![1u32; n_total];
    let mut home = vec![0usize; n_total];

    for (r, buf) in slices.iter().enumerate() {
        let words = decode_u64s(r, buf).map_err(|_| LibraryStatus::InputError)?;
        let [flag, n, weighted, rest @ ..] = words.as_slice() else {
            return Err(LibraryStatus::InputError);
        };
        let (n, weighted) = (*n as usize, *weighted != 0);
        if *flag != SLICE_VALID || n as u64 != vtxdist[r + 1] - vtxdist[r] {
            return Err(LibraryStatus::InputError);
        }
        let xadj = rest.get(..=n).ok_or(LibraryStatus::InputError)?;
        let nnz = xadj[n] as usize;
        let adjncy = rest.get(n + 1..n + 1 + nnz).ok_or(LibraryStatus::InputError)?;
        let weights = &rest[n + 1 + nnz..];
        if weights.len() != if weighted { n } else { 0 } {
            return Err(LibraryStatus::InputError);
        }

        let first = vtxdist[r] as usize;
        for i in 0..n {
            let g = first + i;
            home[g] = r;
            if weighted {
                vwgt[g] = u32::try_from(weights[i]).map_err(|_| LibraryStatus::InputError)?;
            }
            let nbrs = adjncy
                .get(xadj[i] as usize..xadj[i + 1] as usize)
                .ok_or(LibraryStatus::InputError)?;
            for &u in nbrs {
                let u = u as usize;
                if u >= n_total {
                    return Err(LibraryStatus::InputError);
                }
                if u != g {
                    adj[g].push(u);
                    adj[u].push(g);
                }
            }
        }
    }
    for nbrs in &mut adj {
        nbrs.sort_unstable();
        nbrs.dedup();
    }
    let mut graph = DualGraph::from_adjacency(&adj);
    graph.vwgt = vwgt;
    Ok((graph, home))
}

/// Relabel parts so that each new part keeps the label of the current part
/// it overlaps most (greedy, heaviest overlap first).
pub(crate) fn remap_to_home(part: &mut [usize], home: &[usize], vwgt: &[u32], nparts: usize) {
    let mut overlap = vec![vec![0u64; nparts]; nparts];
    for ((&p, &h), &w) in part.iter().zip(home).zip(vwgt) {
        if p < nparts && h < nparts {
            overlap[p][h] += u64::from(w);
        }
    }
    let mut pairs: Vec<(u64, usize, usize)> = overlap
        .iter()
        .enumerate()
        .flat_map(|(new, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &w)| w > 0)
                .map(move |(old, &w)| (w, new, old))
        })
        .collect();
    pairs.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut label: Vec<Option<usize>> = vec![None; nparts];
    let mut used = vec![false; nparts];
    for (_, new, old) in pairs {
        if label[new].is_none() && !used[old] {
            label[new] = Some(old);
            used[old] = true;
        }
    }
    let mut free: VecDeque<usize> = (0..nparts).filter(|&o| !used[o]).collect();
    let mapping: Vec<usize> = label
        .iter()
        .enumerate()
        .map(|(new, l)| l.or_else(|| free.pop_front()).unwrap_or(new))
        .collect();
    for p in part.iter_mut() {
        if *p < nparts {
            *p = mapping[*p];
        }
    }
}

fn encode_reply(
    outcome: &Result<LibraryOutput, LibraryStatus>,
    vtxdist: &[u64],
    rank: usize,
) -> Vec<u8> {
    match outcome {
        Ok(out) => {
            let range = vtxdist[rank] as usize..vtxdist[rank + 1] as usize;
            encode_u64s(
                [0, out.edge_cut]
                    .into_iter()
                    .chain(out.part[range].iter().map(|&p| p as u64)),
            )
        }
        Err(status) => encode_u64s([i64::from(status.code()) as u64, 0]),
    }
}

fn decode_reply(
    from: usize,
    buf: &[u8],
) -> Result<Result<LibraryOutput, LibraryStatus>, MeshError> {
    let words = decode_u64s(from, buf)?;
    let [status, cut, part @ ..] = words.as_slice() else {
        return Err(MeshError::BufferSizeMismatch {
            neighbor: from,
            expected: 16,
            got: buf.len(),
        });
    };
    if *status != 0 {
        let code = *status as i64 as i32;
        return Ok(Err(
            LibraryStatus::from_code(code).unwrap_or(LibraryStatus::Error)
        ));
    }
    Ok(Ok(LibraryOutput {
        part: part.iter().map(|&p| p as usize).collect(),
        edge_cut: *cut,
    }))
}
