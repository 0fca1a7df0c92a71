//! Cell type metadata for mesh elements.
//!
//! Besides the dimension, each cell type knows its reference vertex count
//! and which local vertices make up each of its faces. Face adjacency
//! between elements is derived from those face vertex lists.

/// Common cell types for mesh elements.
///
/// The derived ordering is the order in which the element mapper groups
/// slots, so changing the variant order changes slot numbering.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum CellType {
    /// 1D segment/edge.
    Segment,
    /// 2D simplex (triangle).
    Triangle,
    /// 2D tensor-product cell (quad), vertices counter-clockwise.
    Quadrilateral,
    /// 3D simplex (tet).
    Tetrahedron,
    /// 3D tensor-product cell (hex): bottom face ccw, then top face ccw.
    Hexahedron,
}

const SEGMENT_FACES: &[&[usize]] = &[&[0], &[1]];
const TRIANGLE_FACES: &[&[usize]] = &[&[0, 1], &[1, 2], &[2, 0]];
const QUAD_FACES: &[&[usize]] = &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]];
const TET_FACES: &[&[usize]] = &[&[1, 2, 3], &[0, 2, 3], &[0, 1, 3], &[0, 1, 2]];
const HEX_FACES: &[&[usize]] = &[
    &[0, 1, 2, 3],
    &[4, 5, 6, 7],
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[3, 0, 4, 7],
];

impl CellType {
    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Segment => 1,
            CellType::Triangle | CellType::Quadrilateral => 2,
            CellType::Tetrahedron | CellType::Hexahedron => 3,
        }
    }

    /// Number of vertices of the reference cell.
    pub fn vertex_count(self) -> usize {
        match self {
            CellType::Segment => 2,
            CellType::Triangle => 3,
            CellType::Quadrilateral | CellType::Tetrahedron => 4,
            CellType::Hexahedron => 8,
        }
    }

    /// Local vertex lists of the codim-1 faces.
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            CellType::Segment => SEGMENT_FACES,
            CellType::Triangle => TRIANGLE_FACES,
            CellType::Quadrilateral => QUAD_FACES,
            CellType::Tetrahedron => TET_FACES,
            CellType::Hexahedron => HEX_FACES,
        }
    }

    /// Number of codim-1 faces.
    pub fn face_count(self) -> usize {
        self.faces().len()
    }
}
