//! A single growable byte store
//!
//! # Locking
//!
//! Each store has one `RwLock` around its buffer:
//!
//! - `read` holds it shared while copying out and moving the cursor
//! - `write` holds it exclusively for the whole call, including any growth
//! - `resize` holds it exclusively, and runs the shrink check under it
//!
//! Session cursors only move under this lock, so the shrink check sees a
//! stable set of cursors and a session cannot move past the new end between
//! the check and the swap. The session table has its own mutex, so opening or
//! closing sessions does not wait for a large copy to finish. Lock order is
//! buffer, then session table, then session cursor.
//!
//! Stores never share a lock, so growth on one store never blocks another.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::allocator::{BufferAllocator, Region};
use crate::config::GrowthPolicy;
use crate::error::{Result, StoreError, WriteFailure};
use crate::session::Session;
use crate::session_table::SessionTable;

/// Buffer state guarded by the store lock
///
/// `used` never exceeds `data.len()`, and no cursor exceeds `used`.
struct StoreBuffer {
    data: Region,
    used: usize,
}

impl StoreBuffer {
    fn capacity(&self) -> usize {
        self.data.len()
    }
}

/// Snapshot of a store's size and session count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub id: usize,
    pub capacity: usize,
    pub used: usize,
    pub sessions: usize,
}

pub struct Store {
    id: usize,
    buffer: RwLock<StoreBuffer>,
    sessions: SessionTable,
    allocator: Arc<dyn BufferAllocator>,
    max_capacity: usize,
    growth: GrowthPolicy,
}

impl Store {
    /// Allocate a store with `initial_capacity` bytes.
    ///
    /// # Errors
    ///
    /// `ExceedsMaxCapacity` if the initial size is over the cap,
    /// `AllocationFailure` if the allocator refuses.
    pub fn new(
        id: usize,
        initial_capacity: usize,
        max_capacity: usize,
        concurrency_limit: usize,
        growth: GrowthPolicy,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Result<Self> {
        if initial_capacity > max_capacity {
            return Err(StoreError::ExceedsMaxCapacity {
                requested: initial_capacity,
                max: max_capacity,
            });
        }
        let data = allocator.acquire(initial_capacity)?;
        Ok(Self {
            id,
            buffer: RwLock::new(StoreBuffer { data, used: 0 }),
            sessions: SessionTable::new(id, concurrency_limit),
            allocator,
            max_capacity,
            growth,
        })
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.read().capacity()
    }

    /// High-water mark of written bytes
    #[must_use]
    pub fn used(&self) -> usize {
        self.buffer.read().used
    }

    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let buffer = self.buffer.read();
        StoreStats {
            id: self.id,
            capacity: buffer.capacity(),
            used: buffer.used,
            sessions: self.sessions.open_count(),
        }
    }

    /// Register a new session on this store.
    ///
    /// # Errors
    ///
    /// Returns `SessionLimitReached` when the session table is full.
    pub fn open(self: &Arc<Self>, serial: u64) -> Result<Arc<Session>> {
        let session = self
            .sessions
            .register(Arc::downgrade(self), serial)
            .inspect_err(|e| warn!(store = self.id, error = %e, "open rejected"))?;
        debug!(store = self.id, session = ?session.handle(), "session opened");
        Ok(session)
    }

    /// Reallocate the buffer to `new_capacity` bytes.
    ///
    /// Used bytes are copied over, truncated on a shrink. Nothing changes
    /// unless the new buffer has been allocated and filled.
    ///
    /// # Errors
    ///
    /// - `WouldTruncateActiveCursor` if shrinking would leave a session
    ///   cursor at or past the new end
    /// - `ExceedsMaxCapacity` if `new_capacity` is over the cap
    /// - `AllocationFailure` if the allocator refuses
    pub fn resize(&self, new_capacity: usize) -> Result<()> {
        let mut buffer = self.buffer.write();
        self.resize_locked(&mut buffer, new_capacity)
    }

    fn resize_locked(&self, buffer: &mut StoreBuffer, new_capacity: usize) -> Result<()> {
        let capacity = buffer.capacity();
        if new_capacity == capacity {
            return Ok(());
        }

        if new_capacity < capacity {
            if let Some(cursor) = self.sessions.furthest_cursor_from(new_capacity) {
                warn!(
                    store = self.id,
                    to = new_capacity,
                    cursor,
                    "shrink would cut off a session cursor"
                );
                return Err(StoreError::WouldTruncateActiveCursor {
                    requested: new_capacity,
                    cursor,
                });
            }
        }

        if new_capacity > self.max_capacity {
            warn!(
                store = self.id,
                to = new_capacity,
                max = self.max_capacity,
                "resize over max capacity"
            );
            return Err(StoreError::ExceedsMaxCapacity {
                requested: new_capacity,
                max: self.max_capacity,
            });
        }

        let mut region = self.allocator.acquire(new_capacity).inspect_err(|e| {
            warn!(store = self.id, from = capacity, to = new_capacity, error = %e, "resize failed");
        })?;

        let keep = buffer.used.min(new_capacity);
        region[..keep].copy_from_slice(&buffer.data[..keep]);
        let old = std::mem::replace(&mut buffer.data, region);
        buffer.used = keep;
        self.allocator.release(old);

        debug!(store = self.id, from = capacity, to = new_capacity, "buffer resized");
        Ok(())
    }

    /// Copy out up to `max_count` bytes at `cursor` and advance it.
    pub(crate) fn read_at(&self, cursor: &Mutex<usize>, max_count: usize) -> Vec<u8> {
        let buffer = self.buffer.read();
        let mut cursor = cursor.lock();

        let start = (*cursor).min(buffer.used);
        let end = start + max_count.min(buffer.used - start);
        *cursor = end;
        buffer.data[start..end].to_vec()
    }

    /// Store `bytes` at `cursor`, growing the buffer whenever it is full.
    ///
    /// Since no cursor passes `used`, a cursor at the end of the buffer means
    /// the buffer is full. Overwrites below the end never grow it.
    ///
    /// Growth is checked each time the buffer fills, so a write can stop part
    /// way. The bytes stored before that stay stored and are reported in the
    /// `WriteFailure`.
    pub(crate) fn write_at(
        &self,
        cursor: &Mutex<usize>,
        bytes: &[u8],
    ) -> std::result::Result<usize, WriteFailure> {
        let mut buffer = self.buffer.write();
        let mut cursor = cursor.lock();

        let end = cursor.saturating_add(bytes.len());
        if end > self.max_capacity {
            warn!(
                store = self.id,
                end,
                max = self.max_capacity,
                "write would exceed max capacity"
            );
            return Err(WriteFailure::new(
                0,
                StoreError::ExceedsMaxCapacity {
                    requested: end,
                    max: self.max_capacity,
                },
            ));
        }

        let mut written = 0;
        while written < bytes.len() {
            let remaining = bytes.len() - written;
            if *cursor == buffer.capacity() {
                let target = self
                    .growth
                    .target(buffer.capacity(), remaining, self.max_capacity);
                self.resize_locked(&mut buffer, target)
                    .map_err(|error| WriteFailure::new(written, error))?;
            }

            let chunk = remaining.min(buffer.capacity() - *cursor);
            let at = *cursor;
            buffer.data[at..at + chunk].copy_from_slice(&bytes[written..written + chunk]);
            *cursor = at + chunk;
            buffer.used = buffer.used.max(*cursor);
            written += chunk;
        }
        Ok(written)
    }

    /// Close all sessions and hand the buffer back to the allocator.
    ///
    /// Returns the number of sessions closed and bytes released. Calling it
    /// again releases nothing.
    pub(crate) fn teardown(&self) -> (usize, usize) {
        let mut buffer = self.buffer.write();
        let closed = self.sessions.clear();
        let old = std::mem::take(&mut buffer.data);
        buffer.used = 0;
        let released = old.len();
        self.allocator.release(old);
        (closed, released)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("Store")
            .field("id", &stats.id)
            .field("capacity", &stats.capacity)
            .field("used", &stats.used)
            .field("sessions", &stats.sessions)
            .field("max_capacity", &self.max_capacity)
            .finish_non_exhaustive()
    }
}
