use mesh_rebalance::algs::wire::{decode_u64s, encode_u64s, expect_exact_len};
use mesh_rebalance::prelude::MeshError;

#[test]
fn u64_words_are_little_endian() {
    let buf = encode_u64s([0x0102]);
    assert_eq!(buf, vec![2, 1, 0, 0, 0, 0, 0, 0]);
    assert_eq!(decode_u64s(0, &buf).unwrap(), vec![0x0102]);
}

#[test]
fn expect_exact_len_err() {
    let err = expect_exact_len(5, 3, 4).unwrap_err();
    assert!(matches!(
        err,
        MeshError::BufferSizeMismatch { neighbor: 5, expected: 4, got: 3 }
    ));
    assert!(expect_exact_len(0, 4, 4).is_ok());
}
