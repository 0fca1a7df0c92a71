#![cfg(feature = "mpi-support")]
//! Run with `mpirun -n <k> cargo test --features mpi-support --test mpi_collectives`.

use mesh_rebalance::algs::communicator::{Communicator, MpiComm, all_gather_u64};

#[test]
fn native_gather_and_broadcast_match_rank_layout() {
    let comm = MpiComm::new().expect("mpi init");
    let (rank, size) = (comm.rank(), comm.size());

    // Ragged payloads: rank r contributes r + 1 bytes of value r.
    let mine = vec![rank as u8; rank + 1];
    let gathered = comm.gather(&mine, 0).expect("gather");
    if rank == 0 {
        let parts = gathered.expect("root receives");
        assert_eq!(parts.len(), size);
        for (r, part) in parts.iter().enumerate() {
            assert_eq!(&part[..], &vec![r as u8; r + 1][..]);
        }
    } else {
        assert!(gathered.is_none());
    }

    let mut payload = if rank == 0 { b"vtxdist".to_vec() } else { Vec::new() };
    comm.broadcast(&mut payload, 0).expect("broadcast");
    assert_eq!(payload, b"vtxdist");

    let counts = all_gather_u64(&comm, 10 + rank as u64, 0).expect("all-gather");
    assert_eq!(counts, (0..size as u64).map(|r| 10 + r).collect::<Vec<_>>());

    assert!(comm.gather(&mine, size).is_err());
    comm.barrier().expect("barrier");
}
