//! Client sessions
//!
//! A session is one client's view of a store: a cursor plus a non-owning
//! reference to the store. Sessions on the same store share the bytes but
//! not the offsets, so two writers can overwrite each other's data.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{Result, StoreError, WriteFailure};
use crate::store::Store;

/// Identifies an open session
///
/// `slot` is reused first-fit after a close; `serial` is not, so a handle
/// kept past its `close` never reaches the session that took over its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    store_id: usize,
    slot: usize,
    serial: u64,
}

impl SessionHandle {
    #[must_use]
    pub fn new(store_id: usize, slot: usize, serial: u64) -> Self {
        Self {
            store_id,
            slot,
            serial,
        }
    }

    #[must_use]
    pub fn store_id(&self) -> usize {
        self.store_id
    }

    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// A live session on one store
///
/// The cursor is only read or moved while the owning store's buffer lock is
/// held, which is what lets a shrink inspect every cursor consistently.
pub struct Session {
    handle: SessionHandle,
    store: Weak<Store>,
    cursor: Mutex<usize>,
    closed: AtomicBool,
}

impl Session {
    pub(crate) fn new(handle: SessionHandle, store: Weak<Store>) -> Self {
        Self {
            handle,
            store,
            cursor: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Current read/write offset
    #[must_use]
    pub fn cursor(&self) -> usize {
        *self.cursor.lock()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn cursor_cell(&self) -> &Mutex<usize> {
        &self.cursor
    }

    fn live_store(&self) -> Result<Arc<Store>> {
        if self.is_closed() {
            return Err(StoreError::UnknownHandle(self.handle));
        }
        self.store
            .upgrade()
            .ok_or(StoreError::UnknownHandle(self.handle))
    }

    /// Read up to `max_count` bytes from the cursor and advance past them.
    ///
    /// A result shorter than `max_count`, including an empty one, means the
    /// cursor reached the end of the data written so far. Later writes may
    /// make more available.
    ///
    /// # Errors
    ///
    /// Returns `UnknownHandle` if the session has been closed.
    pub fn read(&self, max_count: usize) -> Result<Vec<u8>> {
        let store = self.live_store()?;
        Ok(store.read_at(&self.cursor, max_count))
    }

    /// Write `bytes` at the cursor, growing the store when it is full.
    ///
    /// # Errors
    ///
    /// On failure the returned [`WriteFailure`] says how many bytes were
    /// stored before the store refused to grow.
    pub fn write(&self, bytes: &[u8]) -> std::result::Result<usize, WriteFailure> {
        let store = self.live_store()?;
        store.write_at(&self.cursor, bytes)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("cursor", &self.cursor())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
