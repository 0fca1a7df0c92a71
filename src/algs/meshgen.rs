//! Basic mesh generators for structured boxes.
//!
//! Vertices of an `nx` by `ny` box are numbered row by row,
//! `j * (nx + 1) + i`; elements likewise, so global position reflects
//! geometry. Element ids are the scrambled sparse ids of [`GlobalMesh::new`].

use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::local_mesh::GlobalMesh;

fn vertex(nx: usize, i: usize, j: usize) -> usize {
    j * (nx + 1) + i
}

// corners of box cell (i, j), counter-clockwise from the lower left
fn corners(nx: usize, i: usize, j: usize) -> [usize; 4] {
    [
        vertex(nx, i, j),
        vertex(nx, i + 1, j),
        vertex(nx, i + 1, j + 1),
        vertex(nx, i, j + 1),
    ]
}

/// `nx * ny` quadrilaterals.
pub fn structured_quads(nx: usize, ny: usize) -> Result<GlobalMesh, MeshError> {
    let mut cells = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            cells.push((CellType::Quadrilateral, corners(nx, i, j).to_vec()));
        }
    }
    GlobalMesh::new(cells)
}

/// `2 * nx * ny` triangles, each box cell cut along its diagonal.
pub fn structured_triangles(nx: usize, ny: usize) -> Result<GlobalMesh, MeshError> {
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let [a, b, c, d] = corners(nx, i, j);
            cells.push((CellType::Triangle, vec![a, b, c]));
            cells.push((CellType::Triangle, vec![a, c, d]));
        }
    }
    GlobalMesh::new(cells)
}

/// Even columns are quadrilaterals, odd columns pairs of triangles.
pub fn structured_mixed(nx: usize, ny: usize) -> Result<GlobalMesh, MeshError> {
    let mut cells = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            let [a, b, c, d] = corners(nx, i, j);
            if i % 2 == 0 {
                cells.push((CellType::Quadrilateral, vec![a, b, c, d]));
            } else {
                cells.push((CellType::Triangle, vec![a, b, c]));
                cells.push((CellType::Triangle, vec![a, c, d]));
            }
        }
    }
    GlobalMesh::new(cells)
}

/// `n` triangles sharing no vertex: a mesh whose dual graph has no edges.
pub fn disconnected_cells(n: usize) -> Result<GlobalMesh, MeshError> {
    GlobalMesh::new(
        (0..n)
            .map(|k| (CellType::Triangle, vec![3 * k, 3 * k + 1, 3 * k + 2]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_box_adjacency() {
        let m = structured_quads(3, 2).unwrap();
        assert_eq!(m.len(), 6);
        assert_eq!(m.vertex_count(), 12);
        // horizontal: 2 per row, vertical: 3
        assert_eq!(m.edge_count(), 7);
    }

    #[test]
    fn triangle_box_adjacency() {
        let m = structured_triangles(2, 2).unwrap();
        assert_eq!(m.len(), 8);
        // 4 diagonals + 2 vertical + 2 horizontal interior edges
        assert_eq!(m.edge_count(), 8);
    }

    #[test]
    fn mixed_box_is_conforming() {
        let m = structured_mixed(2, 1).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.cell_type(0), CellType::Quadrilateral);
        assert_eq!(m.cell_type(1), CellType::Triangle);
        // quad | tri, tri
        assert_eq!(m.edge_count(), 2);
    }

    #[test]
    fn disconnected_has_no_edges() {
        let m = disconnected_cells(5).unwrap();
        assert_eq!(m.len(), 5);
        assert_eq!(m.edge_count(), 0);
    }
}
