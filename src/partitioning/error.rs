//! Status codes reported by partitioning libraries.

use thiserror::Error;

/// Failure status of a partitioning routine, mirroring the METIS/ParMETIS
/// return codes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryStatus {
    /// Malformed or inconsistent input arrays.
    #[error("input error")]
    InputError,
    /// The library could not allocate its work space.
    #[error("out of memory")]
    MemoryError,
    /// Any other failure.
    #[error("partitioner error")]
    Error,
}

impl LibraryStatus {
    /// Numeric code as returned by METIS (`METIS_ERROR_INPUT` etc.).
    pub fn code(self) -> i32 {
        match self {
            LibraryStatus::InputError => -2,
            LibraryStatus::MemoryError => -3,
            LibraryStatus::Error => -4,
        }
    }

    /// Inverse of [`code`](Self::code). `None` for success (1) or unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(LibraryStatus::InputError),
            -3 => Some(LibraryStatus::MemoryError),
            -4 => Some(LibraryStatus::Error),
            _ => None,
        }
    }
}
