use mesh_rebalance::algs::dual_graph::{DualGraph, mesh_to_dual, validate_csr};
use mesh_rebalance::algs::meshgen::{structured_mixed, structured_quads, structured_triangles};
use mesh_rebalance::prelude::*;

// element/vertex lists in global position order
fn eptr_eind(global: &GlobalMesh) -> (Vec<usize>, Vec<usize>) {
    let mut eptr = vec![0];
    let mut eind = Vec::new();
    for pos in 0..global.len() {
        eind.extend_from_slice(global.cell_vertices(pos));
        eptr.push(eind.len());
    }
    (eptr, eind)
}

fn assert_matches_faces(global: &GlobalMesh, dual: &DualGraph) {
    for pos in 0..global.len() {
        let mut faces: Vec<usize> = global.neighbors(pos).iter().flatten().copied().collect();
        faces.sort_unstable();
        assert_eq!(dual.neighbors(pos), faces.as_slice(), "element {pos}");
    }
}

#[test]
fn shared_edges_are_face_adjacency_in_2d() {
    for global in [
        structured_quads(3, 2).unwrap(),
        structured_triangles(2, 2).unwrap(),
        structured_mixed(4, 3).unwrap(),
    ] {
        let (eptr, eind) = eptr_eind(&global);
        let dual = mesh_to_dual(&eptr, &eind, 2, None).unwrap();
        dual.validate().unwrap();
        assert_matches_faces(&global, &dual);
        assert_eq!(dual.edge_count(), global.edge_count());
    }
}

#[test]
fn edge_counts_of_boxes() {
    // 3 x 2 quads: 4 horizontal + 3 vertical faces
    assert_eq!(structured_quads(3, 2).unwrap().edge_count(), 7);
    // 2 x 2 boxes, two triangles each: 4 diagonals + 2 + 2 box faces
    assert_eq!(structured_triangles(2, 2).unwrap().edge_count(), 8);
}

#[test]
fn corner_contacts_join_with_one_common_node() {
    let global = structured_quads(3, 2).unwrap();
    let (eptr, eind) = eptr_eind(&global);
    let dual = mesh_to_dual(&eptr, &eind, 1, None).unwrap();
    // plus two diagonals per interior vertex
    assert_eq!(dual.edge_count(), 11);
}

#[test]
fn weights_carry_over() {
    let global = structured_quads(2, 1).unwrap();
    let (eptr, eind) = eptr_eind(&global);
    let dual = mesh_to_dual(&eptr, &eind, 2, Some(&[3, 4])).unwrap();
    assert_eq!(dual.vwgt, vec![3, 4]);
    assert_eq!(dual.total_weight(), 7);
}

#[test]
fn zero_ncommon_is_invalid() {
    let err = mesh_to_dual(&[0, 2], &[0, 1], 0, None).unwrap_err();
    assert!(matches!(err, MeshError::InvalidConfig(_)));
}

#[test]
fn csr_bounds() {
    assert!(validate_csr(&[0, 1, 2], &[1u64, 0], 2).is_ok());
    assert!(validate_csr(&[0, 1, 2], &[1u64, 2], 2).is_err());
    assert!(validate_csr(&[1, 2], &[0u64, 0], 2).is_err());
}
