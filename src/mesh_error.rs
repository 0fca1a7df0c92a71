//! MeshError: Unified error type for mesh-rebalance public APIs
//!
//! Every fallible operation in the crate returns this type. None of the
//! variants is recoverable inside an epoch: the caller must discard any
//! partially built index table or partition assignment.

use thiserror::Error;

use crate::partitioning::LibraryStatus;
use crate::topology::point::PointId;

/// Unified error type for mesh-rebalance operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Attempted to construct a PointId with a zero value (invalid).
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
    /// The same sparse identifier was listed twice by one directory.
    #[error("duplicate entity id {0} in local directory")]
    DuplicateEntity(PointId),
    /// The entity is not present in the local directory or index table.
    #[error("entity {0} is not present in the local directory")]
    UnknownEntity(PointId),
    /// An entity kept the unresolved sentinel after the resolution exchange.
    #[error("entity {id} on rank {rank} has no owner among the processes holding a copy")]
    UnresolvedIndex { id: PointId, rank: usize },
    /// Two processes claimed ownership of the same entity.
    #[error(
        "entity {id} on rank {rank} holds index {local} but rank {from} sent {received}"
    )]
    ConflictingIndex {
        id: PointId,
        rank: usize,
        from: usize,
        local: i64,
        received: i64,
    },
    /// A collective operation failed on another rank; this rank's result
    /// was discarded with it.
    #[error("operation failed on rank {rank}; local result discarded")]
    RemoteFailure { rank: usize },
    /// A global index was used after the directory changed underneath it.
    #[error("global index computed at epoch {computed} used at epoch {current}; re-run index assignment")]
    StaleIndex { computed: u64, current: u64 },
    /// The external partitioning routine reported failure.
    #[error("partitioning library failed: {status} (code {code})")]
    Partitioner { status: LibraryStatus, code: i32 },
    /// Malformed CSR / element arrays.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
    /// An element slot reported by the directory lies outside the slot range.
    #[error("element slot {slot} out of range (slot count {count})")]
    SlotOutOfRange { slot: usize, count: usize },
    /// Communication failure with a neighbor.
    #[error("communication error with rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A received message did not decode into whole records.
    #[error("buffer size mismatch from rank {neighbor}: expected a multiple of {expected} bytes, got {got}")]
    BufferSizeMismatch {
        neighbor: usize,
        expected: usize,
        got: usize,
    },
    /// Two arrays that must agree in length did not.
    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A peer rank outside the communicator was addressed.
    #[error("rank {rank} out of range for communicator of size {size}")]
    RankOutOfRange { rank: usize, size: usize },
}

impl MeshError {
    pub(crate) fn comm(neighbor: usize, msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        MeshError::CommError {
            neighbor,
            source: msg.into(),
        }
    }
}
