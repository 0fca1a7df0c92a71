//! Partition roles of local entities.
//!
//! Every entity a process holds is either the canonical (owned) copy or a
//! replica of an entity owned elsewhere. Only owned entities are counted and
//! numbered locally; replicas learn their numbering from the owner.

use serde::{Deserialize, Serialize};

/// Role of a local entity with respect to the partition.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PartitionRole {
    /// Interior or owned border entity; this process numbers it.
    Owned,
    /// Overlap copy of an entity owned by another process.
    Shared,
    /// Ghost-layer replica of an entity owned by another process.
    Ghost,
}

impl PartitionRole {
    /// True for the single copy that is responsible for numbering.
    #[inline]
    pub fn is_owned(self) -> bool {
        matches!(self, PartitionRole::Owned)
    }

    /// Role for a copy of an entity owned by `owner`, as seen on `my_rank`.
    #[inline]
    pub fn from_owner(owner: usize, my_rank: usize) -> Self {
        if owner == my_rank {
            PartitionRole::Owned
        } else {
            PartitionRole::Ghost
        }
    }
}
