//! In-memory meshes: a serial [`GlobalMesh`] and one rank's [`LocalMesh`].
//!
//! `GlobalMesh` holds every element with its stable id, cell type, vertices
//! and face adjacency. `LocalMesh` is the per-process view built from it by
//! [`crate::algs::distribute::distribute_mesh`] (or assembled by hand from
//! [`ElementRecord`]s) and implements [`EntityDirectory`].

use std::collections::HashMap;

use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::directory::EntityDirectory;
use crate::topology::ownership::PartitionRole;
use crate::topology::point::PointId;

/// Odd multiplier: bijective on `u64`, so scrambled ids stay unique and non-zero.
const ID_SCRAMBLE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Sparse id for the element at global position `pos`.
///
/// Ids are unique but neither contiguous nor ordered by position.
pub fn sparse_id(pos: usize) -> Result<PointId, MeshError> {
    PointId::new((pos as u64 + 1).wrapping_mul(ID_SCRAMBLE))
}

/// Serial description of a whole mesh.
#[derive(Clone, Debug)]
pub struct GlobalMesh {
    ids: Vec<PointId>,
    cell_types: Vec<CellType>,
    cells: Vec<Vec<usize>>,
    neighbors: Vec<Vec<Option<usize>>>,
    position: HashMap<PointId, usize>,
    vertex_count: usize,
}

impl GlobalMesh {
    /// Build a mesh from `(cell type, global vertex ids)` pairs, assigning
    /// scrambled sparse ids.
    pub fn new(cells: Vec<(CellType, Vec<usize>)>) -> Result<Self, MeshError> {
        let ids = (0..cells.len())
            .map(sparse_id)
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_ids(ids, cells)
    }

    /// Build a mesh with caller-chosen sparse ids.
    pub fn with_ids(
        ids: Vec<PointId>,
        cells: Vec<(CellType, Vec<usize>)>,
    ) -> Result<Self, MeshError> {
        if ids.len() != cells.len() {
            return Err(MeshError::LengthMismatch {
                what: "element ids",
                expected: cells.len(),
                got: ids.len(),
            });
        }
        let mut position = HashMap::with_capacity(ids.len());
        for (pos, &id) in ids.iter().enumerate() {
            if position.insert(id, pos).is_some() {
                return Err(MeshError::DuplicateEntity(id));
            }
        }
        let mut vertex_count = 0;
        for (pos, (ct, verts)) in cells.iter().enumerate() {
            if verts.len() != ct.vertex_count() {
                return Err(MeshError::InvalidGraph(format!(
                    "element {pos} is a {ct:?} with {} vertices",
                    verts.len()
                )));
            }
            if let Some(&max) = verts.iter().max() {
                vertex_count = vertex_count.max(max + 1);
            }
        }
        let (cell_types, cells): (Vec<_>, Vec<_>) = cells.into_iter().unzip();
        let neighbors = face_adjacency(&cell_types, &cells);
        Ok(Self {
            ids,
            cell_types,
            cells,
            neighbors,
            position,
            vertex_count,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn id(&self, pos: usize) -> PointId {
        self.ids[pos]
    }

    pub fn position(&self, id: PointId) -> Option<usize> {
        self.position.get(&id).copied()
    }

    pub fn cell_type(&self, pos: usize) -> CellType {
        self.cell_types[pos]
    }

    pub fn cell_vertices(&self, pos: usize) -> &[usize] {
        &self.cells[pos]
    }

    /// Neighbor across each face of `pos` (`None` on the boundary).
    pub fn neighbors(&self, pos: usize) -> &[Option<usize>] {
        &self.neighbors[pos]
    }

    /// Number of undirected face-adjacency edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors
            .iter()
            .map(|n| n.iter().flatten().count())
            .sum::<usize>()
            / 2
    }
}

// Two elements are neighbors across a face when they list the same face
// vertex set; a third element on the same face is ignored (non-manifold).
fn face_adjacency(cell_types: &[CellType], cells: &[Vec<usize>]) -> Vec<Vec<Option<usize>>> {
    let mut neighbors: Vec<Vec<Option<usize>>> = cell_types
        .iter()
        .map(|ct| vec![None; ct.face_count()])
        .collect();
    let mut first_seen: HashMap<Vec<usize>, (usize, usize)> = HashMap::new();
    for (cell, (ct, verts)) in cell_types.iter().zip(cells).enumerate() {
        for (face, local) in ct.faces().iter().enumerate() {
            let mut key: Vec<usize> = local.iter().map(|&v| verts[v]).collect();
            key.sort_unstable();
            match first_seen.remove(&key) {
                Some((other, other_face)) => {
                    neighbors[cell][face] = Some(other);
                    neighbors[other][other_face] = Some(cell);
                }
                None => {
                    first_seen.insert(key, (cell, face));
                }
            }
        }
    }
    neighbors
}

/// One local element as stored by [`LocalMesh`].
#[derive(Clone, Debug, PartialEq)]
pub struct ElementRecord {
    pub id: PointId,
    pub role: PartitionRole,
    pub cell_type: CellType,
    /// Local vertex indices.
    pub vertices: Vec<usize>,
    /// Local position of the neighbor across each face.
    pub faces: Vec<Option<usize>>,
    /// Remote ranks holding a copy.
    pub copies: Vec<usize>,
    pub weight: u32,
}

/// One process' view of a distributed mesh.
#[derive(Clone, Debug)]
pub struct LocalMesh {
    rank: usize,
    epoch: u64,
    elements: Vec<ElementRecord>,
    by_id: HashMap<PointId, usize>,
    slots: Vec<usize>,
}

impl LocalMesh {
    /// Assemble a local mesh from element records in traversal order.
    ///
    /// Slots are grouped by cell type, then by traversal position.
    pub fn from_records(
        rank: usize,
        epoch: u64,
        elements: Vec<ElementRecord>,
    ) -> Result<Self, MeshError> {
        let mut by_id = HashMap::with_capacity(elements.len());
        for (pos, el) in elements.iter().enumerate() {
            if by_id.insert(el.id, pos).is_some() {
                return Err(MeshError::DuplicateEntity(el.id));
            }
            if let Some(bad) = el.faces.iter().flatten().find(|&&n| n >= elements.len()) {
                return Err(MeshError::InvalidGraph(format!(
                    "element {} references local neighbor {bad} of {}",
                    el.id,
                    elements.len()
                )));
            }
        }
        let mut order: Vec<usize> = (0..elements.len()).collect();
        order.sort_by_key(|&pos| (elements[pos].cell_type, pos));
        let mut slots = vec![0; elements.len()];
        for (slot, pos) in order.into_iter().enumerate() {
            slots[pos] = slot;
        }
        Ok(Self {
            rank,
            epoch,
            elements,
            by_id,
            slots,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, pos: usize) -> &ElementRecord {
        &self.elements[pos]
    }

    pub fn owned_count(&self) -> usize {
        self.elements.iter().filter(|e| e.role.is_owned()).count()
    }

    /// Override the weight of the element with sparse id `id`.
    pub fn set_weight(&mut self, id: PointId, weight: u32) -> Result<(), MeshError> {
        let pos = *self.by_id.get(&id).ok_or(MeshError::UnknownEntity(id))?;
        self.elements[pos].weight = weight;
        Ok(())
    }
}

impl EntityDirectory for LocalMesh {
    type Entity = usize;

    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn entities(&self) -> impl Iterator<Item = usize> + '_ {
        0..self.elements.len()
    }

    fn role(&self, e: usize) -> PartitionRole {
        self.elements[e].role
    }

    fn id(&self, e: usize) -> PointId {
        self.elements[e].id
    }

    fn lookup(&self, id: PointId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    fn copies(&self, e: usize) -> impl Iterator<Item = usize> + '_ {
        self.elements[e].copies.iter().copied()
    }

    fn face_neighbors(&self, e: usize) -> impl Iterator<Item = Option<usize>> + '_ {
        self.elements[e].faces.iter().copied()
    }

    fn vertices(&self, e: usize) -> &[usize] {
        &self.elements[e].vertices
    }

    fn slot(&self, e: usize) -> usize {
        self.slots[e]
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn weight(&self, e: usize) -> u32 {
        self.elements[e].weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_quads() -> GlobalMesh {
        // 3---4---5
        // |   |   |
        // 0---1---2
        GlobalMesh::new(vec![
            (CellType::Quadrilateral, vec![0, 1, 4, 3]),
            (CellType::Quadrilateral, vec![1, 2, 5, 4]),
        ])
        .unwrap()
    }

    #[test]
    fn shared_face_links_both_cells() {
        let m = two_quads();
        assert_eq!(m.neighbors(0), &[None, Some(1), None, None]);
        assert_eq!(m.neighbors(1), &[None, None, None, Some(0)]);
        assert_eq!(m.edge_count(), 1);
        assert_eq!(m.vertex_count(), 6);
    }

    #[test]
    fn sparse_ids_are_unique_and_unordered() {
        let ids: Vec<u64> = (0..64).map(|p| sparse_id(p).unwrap().get()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_ne!(sorted, ids);
    }

    #[test]
    fn wrong_vertex_count_is_rejected() {
        let err = GlobalMesh::new(vec![(CellType::Triangle, vec![0, 1])]).unwrap_err();
        assert!(matches!(err, MeshError::InvalidGraph(_)));
    }

    #[test]
    fn slots_group_by_cell_type() {
        let rec = |raw, ct: CellType| ElementRecord {
            id: PointId::new(raw).unwrap(),
            role: PartitionRole::Owned,
            cell_type: ct,
            vertices: vec![0; ct.vertex_count()],
            faces: vec![None; ct.face_count()],
            copies: vec![],
            weight: 1,
        };
        let mesh = LocalMesh::from_records(
            0,
            0,
            vec![
                rec(10, CellType::Quadrilateral),
                rec(11, CellType::Triangle),
                rec(12, CellType::Quadrilateral),
                rec(13, CellType::Triangle),
            ],
        )
        .unwrap();
        let slots: Vec<usize> = mesh.entities().map(|e| mesh.slot(e)).collect();
        assert_eq!(slots, vec![2, 0, 3, 1]);
        assert_eq!(mesh.lookup(PointId::new(13).unwrap()), Some(3));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let id = PointId::new(5).unwrap();
        let err = GlobalMesh::with_ids(
            vec![id, id],
            vec![
                (CellType::Segment, vec![0, 1]),
                (CellType::Segment, vec![1, 2]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::DuplicateEntity(p) if p == id));
    }
}
