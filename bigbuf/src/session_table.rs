//! Per-store table of open sessions
//!
//! A fixed number of slots, filled lowest index first. The table only holds
//! sessions; it never touches store buffers.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::error::{Result, StoreError};
use crate::session::{Session, SessionHandle};
use crate::store::Store;

pub struct SessionTable {
    store_id: usize,
    slots: Mutex<Vec<Option<Arc<Session>>>>,
}

impl SessionTable {
    #[must_use]
    pub fn new(store_id: usize, limit: usize) -> Self {
        Self {
            store_id,
            slots: Mutex::new(vec![None; limit]),
        }
    }

    /// Maximum number of concurrent sessions
    #[must_use]
    pub fn limit(&self) -> usize {
        self.slots.lock().len()
    }

    /// Number of occupied slots
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }

    /// Place a new session in the lowest free slot.
    ///
    /// # Errors
    ///
    /// Returns `SessionLimitReached` when every slot is taken.
    pub fn register(&self, store: Weak<Store>, serial: u64) -> Result<Arc<Session>> {
        let mut slots = self.slots.lock();
        let limit = slots.len();
        let Some((index, slot)) = slots.iter_mut().enumerate().find(|(_, s)| s.is_none()) else {
            return Err(StoreError::SessionLimitReached {
                store_id: self.store_id,
                limit,
            });
        };

        let handle = SessionHandle::new(self.store_id, index, serial);
        let session = Arc::new(Session::new(handle, store));
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Look up a session; `None` if the handle is stale or was never issued.
    #[must_use]
    pub fn get(&self, handle: SessionHandle) -> Option<Arc<Session>> {
        if handle.store_id() != self.store_id {
            return None;
        }
        let slots = self.slots.lock();
        slots
            .get(handle.slot())
            .and_then(Option::as_ref)
            .filter(|session| session.handle() == handle)
            .cloned()
    }

    /// Free the slot held by `handle` and return its session.
    ///
    /// The session is marked closed, so clones of it held elsewhere stop
    /// working as well.
    pub fn deregister(&self, handle: SessionHandle) -> Option<Arc<Session>> {
        if handle.store_id() != self.store_id {
            return None;
        }
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(handle.slot())?;
        if slot.as_ref().map(|session| session.handle()) != Some(handle) {
            return None;
        }
        let session = slot.take()?;
        session.mark_closed();
        Some(session)
    }

    /// Close every session, returning how many were open.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock();
        let mut closed = 0;
        for session in slots.iter_mut().filter_map(Option::take) {
            session.mark_closed();
            closed += 1;
        }
        closed
    }

    /// The largest cursor at or beyond `offset`, if any session has one.
    ///
    /// Callers must hold the store's buffer lock exclusively so no cursor
    /// moves during the scan.
    #[must_use]
    pub fn furthest_cursor_from(&self, offset: usize) -> Option<usize> {
        let slots = self.slots.lock();
        slots
            .iter()
            .flatten()
            .map(|session| *session.cursor_cell().lock())
            .filter(|&cursor| cursor >= offset)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(limit: usize) -> SessionTable {
        SessionTable::new(0, limit)
    }

    #[test]
    fn test_register_first_fit() {
        let table = table(3);
        let a = table.register(Weak::new(), 1).unwrap();
        let b = table.register(Weak::new(), 2).unwrap();
        let c = table.register(Weak::new(), 3).unwrap();
        assert_eq!(a.handle().slot(), 0);
        assert_eq!(b.handle().slot(), 1);
        assert_eq!(c.handle().slot(), 2);

        table.deregister(b.handle()).unwrap();
        let d = table.register(Weak::new(), 4).unwrap();
        assert_eq!(d.handle().slot(), 1);
        assert_eq!(table.open_count(), 3);
    }

    #[test]
    fn test_register_full() {
        let table = table(1);
        table.register(Weak::new(), 1).unwrap();
        let err = table.register(Weak::new(), 2).unwrap_err();
        assert_eq!(err, StoreError::SessionLimitReached { store_id: 0, limit: 1 });
    }

    #[test]
    fn test_stale_handle_rejected_after_slot_reuse() {
        let table = table(1);
        let old = table.register(Weak::new(), 1).unwrap().handle();
        table.deregister(old).unwrap();
        let new = table.register(Weak::new(), 2).unwrap().handle();

        assert_eq!(old.slot(), new.slot());
        assert!(table.get(old).is_none());
        assert!(table.deregister(old).is_none());
        assert!(table.get(new).is_some());
    }

    #[test]
    fn test_deregister_marks_closed() {
        let table = table(2);
        let session = table.register(Weak::new(), 1).unwrap();
        assert!(!session.is_closed());
        table.deregister(session.handle());
        assert!(session.is_closed());
        assert_eq!(table.open_count(), 0);
    }

    #[test]
    fn test_foreign_store_handle_ignored() {
        let table = table(2);
        table.register(Weak::new(), 1).unwrap();
        let foreign = SessionHandle::new(1, 0, 1);
        assert!(table.get(foreign).is_none());
        assert!(table.deregister(foreign).is_none());
    }

    #[test]
    fn test_clear() {
        let table = table(4);
        let a = table.register(Weak::new(), 1).unwrap();
        table.register(Weak::new(), 2).unwrap();
        assert_eq!(table.clear(), 2);
        assert_eq!(table.open_count(), 0);
        assert!(a.is_closed());
    }

    #[test]
    fn test_furthest_cursor_from() {
        let table = table(3);
        let a = table.register(Weak::new(), 1).unwrap();
        let b = table.register(Weak::new(), 2).unwrap();
        *a.cursor_cell().lock() = 5;
        *b.cursor_cell().lock() = 12;

        assert_eq!(table.furthest_cursor_from(13), None);
        assert_eq!(table.furthest_cursor_from(12), Some(12));
        assert_eq!(table.furthest_cursor_from(3), Some(12));
    }
}
