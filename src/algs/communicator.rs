//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Everything here is blocking and assumed reliable. The one required
//! primitive is a sparse neighbor exchange; gather, broadcast and barrier
//! have default implementations on top of it and may be overridden by
//! backends with native collectives.
//!
//! Collectives must be entered by every rank of the communicator, in the
//! same order. A rank that skips one leaves the others waiting forever
//! (or, for [`ThreadComm`], until its timeout fires).

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::algs::wire::expect_exact_len;
use crate::mesh_error::MeshError;

/// Message tag. Tags separate independent exchanges between the same pair of ranks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const GATHER: CommTag = CommTag(0xFF00);
    pub const BROADCAST: CommTag = CommTag(0xFF01);
    pub const BARRIER: CommTag = CommTag(0xFF02);
    pub const INDEX_EXCHANGE: CommTag = CommTag(0x1D00);
    pub const REPARTITION: CommTag = CommTag(0x2A00);

    pub const fn new(raw: u16) -> Self {
        CommTag(raw)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Derived tag for a sub-stage of an exchange.
    pub const fn offset(self, by: u16) -> Self {
        CommTag(self.0.wrapping_add(by))
    }
}

/// Blocking point-to-point exchange plus the collectives built on it.
pub trait Communicator {
    /// This process' rank.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Send `outgoing[peer]` to each peer and receive one message from each
    /// rank in `sources`. Returns the received messages keyed by source.
    ///
    /// Both sides must agree on the pattern: `b ∈ sources(a)` iff
    /// `a ∈ outgoing(b)`.
    fn exchange(
        &self,
        tag: CommTag,
        outgoing: &BTreeMap<usize, Vec<u8>>,
        sources: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, Bytes>, MeshError>;

    /// Collect `data` from every rank on `root`. Returns `Some` (indexed by
    /// rank) on the root, `None` elsewhere.
    fn gather(&self, data: &[u8], root: usize) -> Result<Option<Vec<Bytes>>, MeshError> {
        check_rank(root, self.size())?;
        let me = self.rank();
        if me != root {
            let mut out = BTreeMap::new();
            out.insert(root, data.to_vec());
            self.exchange(CommTag::GATHER, &out, &BTreeSet::new())?;
            return Ok(None);
        }
        let sources: BTreeSet<usize> = (0..self.size()).filter(|&r| r != root).collect();
        let mut received = self.exchange(CommTag::GATHER, &BTreeMap::new(), &sources)?;
        let mut all = Vec::with_capacity(self.size());
        for r in 0..self.size() {
            if r == me {
                all.push(Bytes::copy_from_slice(data));
            } else {
                let msg = received
                    .remove(&r)
                    .ok_or_else(|| MeshError::comm(r, "missing gather contribution"))?;
                all.push(msg);
            }
        }
        Ok(Some(all))
    }

    /// Replace `data` on every rank with the root's value.
    fn broadcast(&self, data: &mut Vec<u8>, root: usize) -> Result<(), MeshError> {
        check_rank(root, self.size())?;
        if self.rank() == root {
            let out: BTreeMap<usize, Vec<u8>> = (0..self.size())
                .filter(|&r| r != root)
                .map(|r| (r, data.clone()))
                .collect();
            self.exchange(CommTag::BROADCAST, &out, &BTreeSet::new())?;
        } else {
            let sources = BTreeSet::from([root]);
            let mut received = self.exchange(CommTag::BROADCAST, &BTreeMap::new(), &sources)?;
            let msg = received
                .remove(&root)
                .ok_or_else(|| MeshError::comm(root, "missing broadcast payload"))?;
            *data = msg.to_vec();
        }
        Ok(())
    }

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), MeshError> {
        self.gather(&[], 0)?;
        let mut token = Vec::new();
        self.broadcast(&mut token, 0)
    }
}

fn check_rank(rank: usize, size: usize) -> Result<(), MeshError> {
    if rank < size {
        Ok(())
    } else {
        Err(MeshError::RankOutOfRange { rank, size })
    }
}

/// Gather one `u64` per rank to `root` and broadcast the full vector back,
/// so every rank ends up with the same vector (indexed by rank).
pub fn all_gather_u64<C>(comm: &C, value: u64, root: usize) -> Result<Vec<u64>, MeshError>
where
    C: Communicator + ?Sized,
{
    let gathered = comm.gather(&value.to_le_bytes(), root)?;
    let mut buf = match gathered {
        Some(parts) => {
            let mut buf = Vec::with_capacity(parts.len() * 8);
            for (r, part) in parts.iter().enumerate() {
                expect_exact_len(r, part.len(), 8)?;
                buf.extend_from_slice(part);
            }
            buf
        }
        None => Vec::new(),
    };
    comm.broadcast(&mut buf, root)?;
    expect_exact_len(root, buf.len(), comm.size() * 8)?;
    Ok(buf
        .chunks_exact(8)
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            u64::from_le_bytes(raw)
        })
        .collect())
}

/// Single-rank communicator: every collective is local, no peers exist.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(
        &self,
        _tag: CommTag,
        outgoing: &BTreeMap<usize, Vec<u8>>,
        sources: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, Bytes>, MeshError> {
        if let Some(&peer) = outgoing.keys().chain(sources.iter()).next() {
            return Err(MeshError::RankOutOfRange { rank: peer, size: 1 });
        }
        Ok(BTreeMap::new())
    }
}

// --- ThreadComm: ranks as threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    queues: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    arrived: Condvar,
}

/// In-process communicator: each rank is a thread, messages go through a
/// shared mailbox. FIFO per `(src, dst, tag)`.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    timeout: Duration,
    mailbox: Arc<Mailbox>,
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl ThreadComm {
    /// Communicators for ranks `0..size`, sharing one mailbox.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                timeout: Duration::from_secs(60),
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    /// Fail a receive with [`MeshError::CommError`] after `timeout` instead of
    /// waiting forever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn post(&self, peer: usize, tag: CommTag, buf: &[u8]) {
        let mut queues = self.mailbox.queues.lock();
        queues
            .entry((self.rank, peer, tag.as_u16()))
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.mailbox.arrived.notify_all();
    }

    fn take(&self, peer: usize, tag: CommTag) -> Result<Bytes, MeshError> {
        let key = (peer, self.rank, tag.as_u16());
        let mut queues = self.mailbox.queues.lock();
        loop {
            if let Some(msg) = queues.get_mut(&key).and_then(|q| q.pop_front()) {
                return Ok(msg);
            }
            if self
                .mailbox
                .arrived
                .wait_for(&mut queues, self.timeout)
                .timed_out()
            {
                return Err(MeshError::comm(
                    peer,
                    format!("rank {} timed out waiting on tag {:#x}", self.rank, tag.0),
                ));
            }
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(
        &self,
        tag: CommTag,
        outgoing: &BTreeMap<usize, Vec<u8>>,
        sources: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, Bytes>, MeshError> {
        for &peer in outgoing.keys().chain(sources.iter()) {
            check_rank(peer, self.size)?;
        }
        for (&peer, buf) in outgoing {
            self.post(peer, tag, buf);
        }
        let mut received = BTreeMap::new();
        for &peer in sources {
            received.insert(peer, self.take(peer, tag)?);
        }
        Ok(received)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::datatype::PartitionMut;
    use mpi::traits::{
        Communicator as MpiCommunicator, CommunicatorCollectives, Destination, Root, Source,
    };

    fn count_of(len: usize) -> Result<mpi::Count, MeshError> {
        mpi::Count::try_from(len)
            .map_err(|_| MeshError::InvalidConfig(format!("{len} bytes exceed an MPI count")))
    }

    /// MPI world communicator. Dropping it finalizes MPI.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialize MPI and wrap `MPI_COMM_WORLD`.
        pub fn new() -> Result<Self, MeshError> {
            let universe = mpi::initialize()
                .ok_or_else(|| MeshError::InvalidConfig("MPI is already initialized".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    impl super::Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn exchange(
            &self,
            tag: CommTag,
            outgoing: &BTreeMap<usize, Vec<u8>>,
            sources: &BTreeSet<usize>,
        ) -> Result<BTreeMap<usize, Bytes>, MeshError> {
            for &peer in outgoing.keys().chain(sources.iter()) {
                check_rank(peer, self.size)?;
            }
            let mpi_tag = i32::from(tag.as_u16());
            let mut received = BTreeMap::new();
            mpi::request::scope(|scope| {
                let pending: Vec<_> = outgoing
                    .iter()
                    .map(|(&peer, buf)| {
                        self.world
                            .process_at_rank(peer as i32)
                            .immediate_send_with_tag(scope, &buf[..], mpi_tag)
                    })
                    .collect();
                for &peer in sources {
                    let (msg, _status) = self
                        .world
                        .process_at_rank(peer as i32)
                        .receive_vec_with_tag::<u8>(mpi_tag);
                    received.insert(peer, Bytes::from(msg));
                }
                for req in pending {
                    req.wait();
                }
            });
            Ok(received)
        }

        fn gather(&self, data: &[u8], root: usize) -> Result<Option<Vec<Bytes>>, MeshError> {
            check_rank(root, self.size)?;
            let root_proc = self.world.process_at_rank(root as i32);
            let len = count_of(data.len())?;
            if self.rank != root {
                root_proc.gather_into(&len);
                root_proc.gather_varcount_into(data);
                return Ok(None);
            }

            let mut counts: Vec<mpi::Count> = vec![0; self.size];
            root_proc.gather_into_root(&len, &mut counts[..]);
            let displs: Vec<mpi::Count> = counts
                .iter()
                .scan(0, |acc, &c| {
                    let old = *acc;
                    *acc += c;
                    Some(old)
                })
                .collect();
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut buf = vec![0u8; total];
            {
                let mut partition = PartitionMut::new(&mut buf[..], &counts[..], &displs[..]);
                root_proc.gather_varcount_into_root(data, &mut partition);
            }
            let buf = Bytes::from(buf);
            Ok(Some(
                counts
                    .iter()
                    .zip(&displs)
                    .map(|(&c, &d)| buf.slice(d as usize..(d + c) as usize))
                    .collect(),
            ))
        }

        fn broadcast(&self, data: &mut Vec<u8>, root: usize) -> Result<(), MeshError> {
            check_rank(root, self.size)?;
            let root_proc = self.world.process_at_rank(root as i32);
            let mut len = data.len() as u64;
            root_proc.broadcast_into(&mut len);
            data.resize(len as usize, 0);
            root_proc.broadcast_into(&mut data[..]);
            Ok(())
        }

        fn barrier(&self) -> Result<(), MeshError> {
            self.world.barrier();
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    fn run<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = ThreadComm::world(size);
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|c| {
                    let f = &f;
                    s.spawn(move || f(c))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn thread_round_trip_two_ranks() {
        let got = run(2, |c| {
            let peer = 1 - c.rank();
            let out = BTreeMap::from([(peer, vec![c.rank() as u8; 3])]);
            let recv = c
                .exchange(CommTag(7), &out, &BTreeSet::from([peer]))
                .unwrap();
            recv[&peer].to_vec()
        });
        assert_eq!(got, vec![vec![1, 1, 1], vec![0, 0, 0]]);
    }

    #[test]
    fn fifo_per_tag() {
        let comms = ThreadComm::world(2);
        for i in 0..5u8 {
            comms[0]
                .exchange(CommTag(3), &BTreeMap::from([(1, vec![i])]), &BTreeSet::new())
                .unwrap();
        }
        let got: Vec<u8> = (0..5)
            .map(|_| {
                comms[1]
                    .exchange(CommTag(3), &BTreeMap::new(), &BTreeSet::from([0]))
                    .unwrap()[&0][0]
            })
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn all_gather_matches_everywhere() {
        let got = run(4, |c| all_gather_u64(&c, 10 + c.rank() as u64, 0).unwrap());
        for v in got {
            assert_eq!(v, vec![10, 11, 12, 13]);
        }
    }

    #[test]
    fn barrier_completes() {
        let got = run(3, |c| c.barrier().is_ok());
        assert!(got.into_iter().all(|ok| ok));
    }

    #[test]
    fn receive_times_out() {
        let comms = ThreadComm::world(2);
        let c0 = comms[0].clone().with_timeout(Duration::from_millis(20));
        let err = c0
            .exchange(CommTag(9), &BTreeMap::new(), &BTreeSet::from([1]))
            .unwrap_err();
        assert!(matches!(err, MeshError::CommError { neighbor: 1, .. }));
    }

    #[test]
    fn no_comm_is_single_rank() {
        let c = NoComm;
        assert_eq!(all_gather_u64(&c, 5, 0).unwrap(), vec![5]);
        assert!(matches!(
            c.exchange(CommTag(1), &BTreeMap::from([(1, vec![])]), &BTreeSet::new()),
            Err(MeshError::RankOutOfRange { rank: 1, size: 1 })
        ));
    }
}
