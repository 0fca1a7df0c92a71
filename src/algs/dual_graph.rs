//! Build a CSR (compressed-sparse-row) *dual graph* of a mesh.
//
// Each element is a vertex; an undirected edge joins two elements that share
// at least `ncommon` mesh vertices (METIS `MeshToDual` semantics). With
// `ncommon` equal to the face size this is face adjacency.
//
// Returned in ParMETIS-ready CSR triples:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of element *i*
// * `adjncy`                 = concatenated neighbour vertices, ascending
// * `vwgt[i]`                = vertex weight, default = 1
//
// The dual graph is **symmetrised** (i↔j appear in both lists) and
// **self-free** (no loops).

use hashbrown::HashMap;

use crate::mesh_error::MeshError;

/// CSR triple
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualGraph {
    pub xadj: Vec<usize>,
    pub adjncy: Vec<usize>,
    pub vwgt: Vec<u32>,
}

impl DualGraph {
    /// Graph from adjacency lists (assumed symmetric), unit weights.
    pub fn from_adjacency(adj: &[Vec<usize>]) -> Self {
        let mut xadj = Vec::with_capacity(adj.len() + 1);
        let mut adjncy = Vec::new();
        xadj.push(0);
        for nbrs in adj {
            adjncy.extend_from_slice(nbrs);
            xadj.push(adjncy.len());
        }
        Self {
            xadj,
            adjncy,
            vwgt: vec![1; adj.len()],
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.adjncy[self.xadj[v]..self.xadj[v + 1]]
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjncy.len() / 2
    }

    pub fn total_weight(&self) -> u64 {
        self.vwgt.iter().map(|&w| u64::from(w)).sum()
    }

    /// Check CSR shape and that every neighbour is a vertex of this graph.
    pub fn validate(&self) -> Result<(), MeshError> {
        validate_csr(&self.xadj, &self.adjncy, self.len() as u64)?;
        if self.vwgt.len() != self.len() {
            return Err(MeshError::LengthMismatch {
                what: "vertex weights",
                expected: self.len(),
                got: self.vwgt.len(),
            });
        }
        Ok(())
    }
}

/// Check that `xadj` starts at 0, never decreases, ends at `adjncy.len()`,
/// and that every entry of `adjncy` is below `bound`.
pub fn validate_csr<T>(xadj: &[usize], adjncy: &[T], bound: u64) -> Result<(), MeshError>
where
    T: Copy + TryInto<u64> + std::fmt::Display,
{
    if xadj.first().copied().unwrap_or(0) != 0 {
        return Err(MeshError::InvalidGraph("offsets must start at 0".into()));
    }
    if let Some(w) = xadj.windows(2).position(|w| w[1] < w[0]) {
        return Err(MeshError::InvalidGraph(format!(
            "offsets decrease at row {w}"
        )));
    }
    let end = xadj.last().copied().unwrap_or(0);
    if end != adjncy.len() {
        return Err(MeshError::InvalidGraph(format!(
            "offsets end at {end} but {} entries are listed",
            adjncy.len()
        )));
    }
    if let Some(&bad) = adjncy
        .iter()
        .find(|&&n| n.try_into().map_or(true, |v: u64| v >= bound))
    {
        return Err(MeshError::InvalidGraph(format!(
            "entry {bad} out of range (bound {bound})"
        )));
    }
    Ok(())
}

/// Dual graph of the element/vertex lists `eptr`/`eind`.
///
/// Elements `i` and `j` are adjacent iff they share at least `ncommon`
/// vertices. `weights`, when given, become the vertex weights.
pub fn mesh_to_dual(
    eptr: &[usize],
    eind: &[usize],
    ncommon: usize,
    weights: Option<&[u32]>,
) -> Result<DualGraph, MeshError> {
    if ncommon == 0 {
        return Err(MeshError::InvalidConfig("ncommon must be at least 1".into()));
    }
    let n_nodes = eind.iter().max().map_or(0, |&m| m + 1);
    validate_csr(eptr, eind, n_nodes as u64)?;
    let n = eptr.len().saturating_sub(1);

    // node → elements incident to it
    let mut node_elems: Vec<Vec<usize>> = vec![Vec::new(); n_nodes];
    for e in 0..n {
        for &node in &eind[eptr[e]..eptr[e + 1]] {
            if node_elems[node].last() != Some(&e) {
                node_elems[node].push(e);
            }
        }
    }

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut shared: HashMap<usize, usize> = HashMap::new();
    for (e, nbrs) in adj.iter_mut().enumerate() {
        shared.clear();
        for &node in &eind[eptr[e]..eptr[e + 1]] {
            for &other in &node_elems[node] {
                if other != e {
                    *shared.entry(other).or_insert(0) += 1;
                }
            }
        }
        nbrs.extend(
            shared
                .iter()
                .filter(|&(_, &count)| count >= ncommon)
                .map(|(&other, _)| other),
        );
        nbrs.sort_unstable();
    }

    let mut graph = DualGraph::from_adjacency(&adj);
    if let Some(w) = weights {
        if w.len() != n {
            return Err(MeshError::LengthMismatch {
                what: "element weights",
                expected: n,
                got: w.len(),
            });
        }
        graph.vwgt = w.to_vec();
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_graph_two_triangles() {
        // two triangles sharing the edge (1, 2)
        let eptr = [0, 3, 6];
        let eind = [0, 1, 2, 1, 3, 2];
        let dg = mesh_to_dual(&eptr, &eind, 2, None).unwrap();
        assert_eq!(dg.xadj, vec![0, 1, 2]);
        assert_eq!(dg.adjncy, vec![1, 0]);
        assert_eq!(dg.vwgt, vec![1, 1]);
        assert_eq!(dg.edge_count(), 1);
    }

    #[test]
    fn vertex_contact_only_counts_with_ncommon_one() {
        // quads touching at corner 4 only
        let eptr = [0, 4, 8];
        let eind = [0, 1, 4, 3, 4, 5, 8, 7];
        assert_eq!(mesh_to_dual(&eptr, &eind, 2, None).unwrap().edge_count(), 0);
        assert_eq!(mesh_to_dual(&eptr, &eind, 1, None).unwrap().edge_count(), 1);
    }

    #[test]
    fn bad_offsets_are_rejected() {
        let err = mesh_to_dual(&[0, 3, 2], &[0, 1, 2], 2, None).unwrap_err();
        assert!(matches!(err, MeshError::InvalidGraph(_)));
    }

    #[test]
    fn weights_length_checked() {
        let err = mesh_to_dual(&[0, 2], &[0, 1], 1, Some(&[1, 2])).unwrap_err();
        assert!(matches!(err, MeshError::LengthMismatch { .. }));
    }
}
