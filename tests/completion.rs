mod util;

use std::collections::HashMap;
use std::sync::Arc;

use mesh_rebalance::algs::completion::{ExchangeHandle, exchange_shared};
use mesh_rebalance::algs::meshgen::structured_quads;
use mesh_rebalance::prelude::*;
use mesh_rebalance::topology::ElementRecord;
use util::*;

/// Owners publish `100 + rank`; every copy records who sent what.
struct OwnerStamp {
    mine: HashMap<PointId, u64>,
    got: Vec<(PointId, usize, u64)>,
}

impl ExchangeHandle for OwnerStamp {
    type Payload = u64;

    fn gather(&self, id: PointId) -> Option<u64> {
        self.mine.get(&id).copied()
    }

    fn scatter(&mut self, id: PointId, from: usize, payload: u64) -> Result<(), MeshError> {
        self.got.push((id, from, payload));
        Ok(())
    }
}

#[test]
fn ghosts_hear_from_their_owner() {
    let global = Arc::new(structured_quads(6, 2).unwrap());
    let owners = block_owners(global.len(), 3);
    let results = run_ranks(3, |comm| {
        let mesh = replicated(&global, &owners, comm.rank());
        let local = mesh.local();
        let mut handle = OwnerStamp {
            mine: local
                .owned()
                .map(|e| (local.id(e), 100 + comm.rank() as u64))
                .collect(),
            got: Vec::new(),
        };
        exchange_shared(local, &comm, CommTag::new(0x3000), &mut handle).unwrap();
        (local.clone(), handle.got)
    });

    for (local, got) in results {
        for e in local.entities() {
            let id = local.id(e);
            let heard: Vec<_> = got.iter().filter(|(g, _, _)| *g == id).collect();
            if local.role(e).is_owned() {
                assert!(heard.is_empty());
            } else {
                let owner = owners[global.position(id).unwrap()];
                assert_eq!(heard.len(), 1, "ghost {id}");
                assert_eq!(heard[0].1, owner);
                assert_eq!(heard[0].2, 100 + owner as u64);
            }
        }
    }
}

#[test]
fn silent_handles_still_synchronise() {
    let global = Arc::new(structured_quads(4, 1).unwrap());
    let owners = block_owners(global.len(), 2);
    let got = run_ranks(2, |comm| {
        let mesh = replicated(&global, &owners, comm.rank());
        let mut handle = OwnerStamp {
            mine: HashMap::new(),
            got: Vec::new(),
        };
        exchange_shared(mesh.local(), &comm, CommTag::new(0x3001), &mut handle).unwrap();
        handle.got.len()
    });
    assert_eq!(got, vec![0, 0]);
}

fn lone_element(rank: usize, raw: u64, peer: usize) -> LocalMesh {
    LocalMesh::from_records(
        rank,
        0,
        vec![ElementRecord {
            id: pid(raw),
            role: PartitionRole::Owned,
            cell_type: CellType::Segment,
            vertices: vec![0, 1],
            faces: vec![None, None],
            copies: vec![peer],
            weight: 1,
        }],
    )
    .unwrap()
}

#[test]
fn unknown_ids_are_reported() {
    let errs = run_ranks(2, |comm| {
        let me = comm.rank();
        let local = lone_element(me, 7 + me as u64, 1 - me);
        let mut handle = OwnerStamp {
            mine: HashMap::from([(pid(7 + me as u64), 1)]),
            got: Vec::new(),
        };
        exchange_shared(&local, &comm, CommTag::new(0x3002), &mut handle).unwrap_err()
    });
    assert!(matches!(errs[0], MeshError::UnknownEntity(p) if p == pid(8)));
    assert!(matches!(errs[1], MeshError::UnknownEntity(p) if p == pid(7)));
}

#[test]
fn self_copies_are_rejected() {
    let local = lone_element(0, 3, 0);
    let mut handle = OwnerStamp {
        mine: HashMap::new(),
        got: Vec::new(),
    };
    let err = exchange_shared(&local, &NoComm, CommTag::new(0x3003), &mut handle).unwrap_err();
    assert!(matches!(err, MeshError::RankOutOfRange { rank: 0, size: 1 }));
}
