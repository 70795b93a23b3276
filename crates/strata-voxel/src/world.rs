//! Per-chunk lock guard for cross-chunk world stages.
//!
//! A [`WorldSnapshot`] is not chunk data: it is the concurrency boundary that
//! lets world-level stages read and write chunks other than the one that
//! triggered them. Each packed `(chunk_x, chunk_z)` key maps to a lazily
//! created fair (ticket-ordered), re-entrant exclusive lock. Entries are
//! reference counted by in-flight acquisitions and removed on the last
//! release, so an idle world holds no locks.
//!
//! Callers that need several chunks at once must acquire them in a fixed
//! order (ascending packed key) to avoid deadlock; the guard itself only
//! serializes access per key.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::warn;

/// Packs chunk coordinates into the canonical 64-bit key:
/// `(x << 32) | (z as u32)`.
pub fn pack_chunk_key(x: i32, z: i32) -> i64 {
    ((x as i64) << 32) | (z as u32 as i64)
}

/// Errors raised by lock guard misuse.
#[derive(Debug, thiserror::Error)]
pub enum WorldLockError {
    /// `release` was called for a chunk with no live lock entry.
    #[error("chunk ({x}, {z}) has no live lock entry")]
    NotLocked { x: i32, z: i32 },
    /// `release` was called by a thread that does not hold the lock.
    #[error("chunk ({x}, {z}) lock is not held by the releasing thread")]
    NotOwner { x: i32, z: i32 },
}

#[derive(Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: u32,
    next_ticket: u64,
    now_serving: u64,
}

/// One fair, re-entrant exclusive lock. Fairness comes from ticket ordering:
/// waiters take a ticket on arrival and are admitted strictly in ticket order.
#[derive(Default)]
struct ChunkLock {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl ChunkLock {
    fn lock(&self) {
        let me = thread::current().id();
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if st.owner == Some(me) {
            st.depth += 1;
            return;
        }
        let ticket = st.next_ticket;
        st.next_ticket += 1;
        while st.owner.is_some() || st.now_serving != ticket {
            st = self
                .cond
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        st.owner = Some(me);
        st.depth = 1;
    }

    /// Returns `true` when the lock became free (last re-entrant level).
    fn unlock(&self) -> Result<bool, ()> {
        let me = thread::current().id();
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if st.owner != Some(me) {
            return Err(());
        }
        st.depth -= 1;
        if st.depth > 0 {
            return Ok(false);
        }
        st.owner = None;
        st.now_serving += 1;
        self.cond.notify_all();
        Ok(true)
    }
}

struct LockSlot {
    lock: Arc<ChunkLock>,
    /// In-flight acquisitions: holders, re-entrant levels, and queued waiters.
    refs: usize,
}

/// The shared-mutable-resource boundary for world-level generation stages.
pub struct WorldSnapshot {
    locks: DashMap<i64, LockSlot>,
}

impl WorldSnapshot {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquires exclusive access to chunk `(x, z)`, blocking until granted.
    ///
    /// Creation of a missing entry and its first acquisition are atomic with
    /// respect to other threads racing on the same key. Re-entrant: a thread
    /// that already holds the chunk may acquire it again, and must release
    /// once per acquisition.
    pub fn acquire(&self, x: i32, z: i32) {
        let key = pack_chunk_key(x, z);
        // Reserve the entry (and a reference) under the map shard lock, then
        // block on the chunk lock outside it.
        let lock = {
            let mut slot = self.locks.entry(key).or_insert_with(|| LockSlot {
                lock: Arc::new(ChunkLock::default()),
                refs: 0,
            });
            slot.refs += 1;
            Arc::clone(&slot.lock)
        };
        lock.lock();
    }

    /// Releases chunk `(x, z)`. The entry is removed from the map when no
    /// holder or waiter remains, bounding memory for long-lived sessions.
    ///
    /// # Errors
    ///
    /// [`WorldLockError::NotOwner`] if the calling thread does not hold the
    /// lock, [`WorldLockError::NotLocked`] if no entry exists for the key.
    pub fn release(&self, x: i32, z: i32) -> Result<(), WorldLockError> {
        let key = pack_chunk_key(x, z);
        let lock = match self.locks.get(&key) {
            Some(slot) => Arc::clone(&slot.lock),
            None => return Err(WorldLockError::NotLocked { x, z }),
        };
        lock.unlock().map_err(|_| WorldLockError::NotOwner { x, z })?;
        if let Entry::Occupied(mut slot) = self.locks.entry(key) {
            slot.get_mut().refs -= 1;
            if slot.get().refs == 0 {
                slot.remove();
            }
        }
        Ok(())
    }

    /// Acquires chunk `(x, z)` and returns a guard that releases on drop.
    ///
    /// Preferred over bare [`WorldSnapshot::acquire`] in stages: the chunk is
    /// released even on early return or error.
    pub fn lock_scoped(&self, x: i32, z: i32) -> ChunkLockGuard<'_> {
        self.acquire(x, z);
        ChunkLockGuard {
            world: self,
            x,
            z,
        }
    }

    /// Returns `true` if a lock entry currently exists for `(x, z)`.
    ///
    /// An entry exists exactly while some thread holds or waits on the chunk.
    pub fn is_tracked(&self, x: i32, z: i32) -> bool {
        self.locks.contains_key(&pack_chunk_key(x, z))
    }

    /// Number of live lock entries.
    pub fn tracked_count(&self) -> usize {
        self.locks.len()
    }
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one chunk acquisition; releases on drop.
pub struct ChunkLockGuard<'a> {
    world: &'a WorldSnapshot,
    x: i32,
    z: i32,
}

impl ChunkLockGuard<'_> {
    /// The guarded chunk's X coordinate.
    pub fn chunk_x(&self) -> i32 {
        self.x
    }

    /// The guarded chunk's Z coordinate.
    pub fn chunk_z(&self) -> i32 {
        self.z
    }
}

impl Drop for ChunkLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.world.release(self.x, self.z) {
            // A guard always pairs with a successful acquire; a failure here
            // means the lock state was corrupted by a bare release elsewhere.
            warn!(x = self.x, z = self.z, %err, "chunk lock guard release failed");
        }
    }
}
