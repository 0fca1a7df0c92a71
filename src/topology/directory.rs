//! The distributed entity directory consumed by index assignment and the
//! partitioner bridge.
//!
//! A directory is one process' view of a distributed mesh: an iterable set of
//! local elements, each with a partition role, a stable sparse identifier,
//! face adjacency, and the list of remote ranks that hold a copy of it.
//! Where the directory comes from (a mesh library, a generator, a file) is
//! not this crate's business.

use std::fmt::Debug;
use std::hash::Hash;

use crate::topology::ownership::PartitionRole;
use crate::topology::point::PointId;

/// One process' view of a distributed set of mesh elements.
///
/// Iteration order of [`entities`](EntityDirectory::entities) must be fixed
/// for the lifetime of an epoch: index assignment and graph construction
/// both rely on seeing elements in the same order every time.
pub trait EntityDirectory {
    /// Local handle for an element. Only meaningful on this process.
    type Entity: Copy + Eq + Hash + Debug;

    /// Version of the distribution. Must change whenever entities migrate,
    /// appear or disappear.
    fn epoch(&self) -> u64;

    /// All local elements (owned and replicas) in a fixed traversal order.
    fn entities(&self) -> impl Iterator<Item = Self::Entity> + '_;

    /// Owned elements, in traversal order.
    fn owned(&self) -> impl Iterator<Item = Self::Entity> + '_ {
        self.entities().filter(move |&e| self.role(e).is_owned())
    }

    /// Partition role of `e` on this process.
    fn role(&self, e: Self::Entity) -> PartitionRole;

    /// Stable sparse identifier of `e`; identical on every process holding a copy.
    fn id(&self, e: Self::Entity) -> PointId;

    /// Reverse lookup of [`id`](EntityDirectory::id).
    fn lookup(&self, id: PointId) -> Option<Self::Entity>;

    /// Remote ranks holding a copy of `e` (never this rank).
    fn copies(&self, e: Self::Entity) -> impl Iterator<Item = usize> + '_;

    /// One entry per face of `e`: the element across that face, or `None` on
    /// the mesh boundary. For replicas, neighbors beyond the local overlap
    /// are reported as `None` as well.
    fn face_neighbors(&self, e: Self::Entity) -> impl Iterator<Item = Option<Self::Entity>> + '_;

    /// Local vertex indices of `e`, in reference-element order.
    fn vertices(&self, e: Self::Entity) -> &[usize];

    /// Element mapper: dense slot of `e` in `[0, slot_count())`.
    ///
    /// Slots need not follow traversal order (elements of different shapes
    /// may be grouped separately).
    fn slot(&self, e: Self::Entity) -> usize;

    /// Number of element slots (all local elements, owned or not).
    fn slot_count(&self) -> usize;

    /// Computational weight of `e`, used when weighted partitioning is enabled.
    fn weight(&self, _e: Self::Entity) -> u32 {
        1
    }
}
