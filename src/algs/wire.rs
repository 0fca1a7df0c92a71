//! Fixed little-endian wire records for the exchanges in this crate.
//!
//! Every record is a plain-old-data struct so that a message is just a
//! contiguous slice of them; decoding checks that the byte count divides
//! evenly before casting.

use bytemuck::{Pod, Zeroable};

use crate::mesh_error::MeshError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a received buffer from `neighbor` into whole records.
///
/// Works on unaligned input (received buffers carry no alignment guarantee).
pub fn decode_records<T: Pod>(neighbor: usize, buf: &[u8]) -> Result<Vec<T>, MeshError> {
    let width = std::mem::size_of::<T>();
    if width == 0 || buf.len() % width != 0 {
        return Err(MeshError::BufferSizeMismatch {
            neighbor,
            expected: width,
            got: buf.len(),
        });
    }
    Ok(buf
        .chunks_exact(width)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

pub fn expect_exact_len(neighbor: usize, actual: usize, expected: usize) -> Result<(), MeshError> {
    if actual == expected {
        Ok(())
    } else {
        Err(MeshError::BufferSizeMismatch {
            neighbor,
            expected,
            got: actual,
        })
    }
}

/// A sparse entity id and the part it should move to.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireTarget {
    pub id_le: u64,
    pub part_le: u64,
}

impl WireTarget {
    pub fn new(id: u64, part: usize) -> Self {
        Self {
            id_le: id.to_le(),
            part_le: (part as u64).to_le(),
        }
    }
    pub fn id(&self) -> u64 {
        u64::from_le(self.id_le)
    }
    pub fn part(&self) -> usize {
        u64::from_le(self.part_le) as usize
    }
}

/// One `u64` word; used for CSR arrays and part vectors.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireU64(pub u64);

impl WireU64 {
    pub fn of(v: u64) -> Self {
        Self(v.to_le())
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.0)
    }
}

/// Pack a slice of integers as little-endian words.
pub fn encode_u64s(values: impl IntoIterator<Item = u64>) -> Vec<u8> {
    let words: Vec<WireU64> = values.into_iter().map(WireU64::of).collect();
    cast_slice(&words).to_vec()
}

/// Inverse of [`encode_u64s`].
pub fn decode_u64s(neighbor: usize, buf: &[u8]) -> Result<Vec<u64>, MeshError> {
    Ok(decode_records::<WireU64>(neighbor, buf)?
        .iter()
        .map(WireU64::get)
        .collect())
}

static_assertions::const_assert_eq!(std::mem::size_of::<WireTarget>(), 16);
static_assertions::const_assert_eq!(std::mem::size_of::<WireU64>(), 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_record_round_trip() {
        let recs = [WireTarget::new(42, 3), WireTarget::new(7, 0)];
        let bytes = cast_slice(&recs).to_vec();
        let back: Vec<WireTarget> = decode_records(0, &bytes).unwrap();
        assert_eq!((back[0].id(), back[0].part()), (42, 3));
        assert_eq!((back[1].id(), back[1].part()), (7, 0));
    }

    #[test]
    fn decode_reads_unaligned_input() {
        let mut buf = vec![0u8];
        buf.extend(encode_u64s([3, 5]));
        assert_eq!(decode_u64s(0, &buf[1..]).unwrap(), vec![3, 5]);
    }

    #[test]
    fn partial_record_is_rejected() {
        let err = decode_records::<WireTarget>(3, &[0u8; 20]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::BufferSizeMismatch { neighbor: 3, expected: 16, got: 20 }
        ));
    }
}
