//! METIS-backed k-way engine (feature `metis-support`).

use crate::algs::dual_graph::DualGraph;
use crate::partitioning::{KwayEngine, LibraryStatus};

/// `METIS_PartGraphKway` through the `metis` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetisKway;

fn to_idx(v: usize) -> Result<metis::Idx, LibraryStatus> {
    metis::Idx::try_from(v).map_err(|_| LibraryStatus::InputError)
}

impl From<metis::Error> for LibraryStatus {
    fn from(err: metis::Error) -> Self {
        match err {
            metis::Error::Input => LibraryStatus::InputError,
            metis::Error::Memory => LibraryStatus::MemoryError,
            metis::Error::Other => LibraryStatus::Error,
        }
    }
}

impl KwayEngine for MetisKway {
    fn part_graph_kway(
        &self,
        graph: &DualGraph,
        nparts: usize,
        ubvec: f64,
        seed: u64,
    ) -> Result<Vec<usize>, LibraryStatus> {
        graph.validate().map_err(|_| LibraryStatus::InputError)?;
        if nparts == 0 {
            return Err(LibraryStatus::InputError);
        }
        // METIS rejects these; the answer is trivial anyway
        if nparts == 1 || graph.edge_count() == 0 {
            return Ok(vec![0; graph.len()]);
        }

        let mut xadj = graph
            .xadj
            .iter()
            .map(|&x| to_idx(x))
            .collect::<Result<Vec<_>, _>>()?;
        let mut adjncy = graph
            .adjncy
            .iter()
            .map(|&x| to_idx(x))
            .collect::<Result<Vec<_>, _>>()?;
        let mut vwgt = graph
            .vwgt
            .iter()
            .map(|&w| to_idx(w as usize))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ubvec = vec![ubvec as metis::Real];
        let mut part: Vec<metis::Idx> = vec![0; graph.len()];

        metis::Graph::new(1, to_idx(nparts)?, &mut xadj, &mut adjncy)
            .set_vwgt(&mut vwgt)
            .set_ubvec(&mut ubvec)
            .set_option(metis::option::Seed(seed as metis::Idx))
            .part_kway(&mut part)?;

        part.into_iter()
            .map(|p| usize::try_from(p).map_err(|_| LibraryStatus::Error))
            .collect()
    }
}
