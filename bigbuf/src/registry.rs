//! The fixed set of stores and the entry points used by a transport layer
//!
//! A registry is built once with all its stores, passed by reference to
//! everything that opens, reads, writes or closes, and torn down once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::allocator::{BufferAllocator, HeapAllocator};
use crate::config::RegistryConfig;
use crate::error::{Result, StoreError, WriteFailure};
use crate::idgen::IdGen;
use crate::io::SessionIo;
use crate::session::{Session, SessionHandle};
use crate::store::{Store, StoreStats};

/// What [`StoreRegistry::shutdown`] released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stores: usize,
    pub sessions_closed: usize,
    pub bytes_released: usize,
}

pub struct StoreRegistry {
    config: RegistryConfig,
    stores: Vec<Arc<Store>>,
    ids: IdGen,
    /// Open sessions across all stores
    live_sessions: AtomicUsize,
}

impl StoreRegistry {
    /// Create `device_limit` stores on the heap.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for unusable limits, `AllocationFailure` if any store
    /// cannot get its initial buffer.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        Self::with_allocator(config, Arc::new(HeapAllocator::new()))
    }

    /// Create `device_limit` stores backed by `allocator`.
    ///
    /// Startup is all or nothing: if one store fails to allocate, the stores
    /// created before it are released again.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_allocator(
        config: RegistryConfig,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Result<Self> {
        config.validate()?;

        let mut stores = Vec::with_capacity(config.device_limit);
        for id in 0..config.device_limit {
            let store = Store::new(
                id,
                config.initial_capacity,
                config.max_capacity,
                config.concurrency_limit,
                config.growth,
                Arc::clone(&allocator),
            );
            match store {
                Ok(store) => stores.push(Arc::new(store)),
                Err(e) => {
                    warn!(store = id, error = %e, "can't allocate store");
                    for store in &stores {
                        store.teardown();
                    }
                    return Err(e);
                }
            }
        }

        info!(
            stores = config.device_limit,
            initial_capacity = config.initial_capacity,
            "store registry started"
        );
        Ok(Self {
            config,
            stores,
            ids: IdGen::new(),
            live_sessions: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Look up a store by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStoreId` unless `store_id < device_limit`.
    pub fn store(&self, store_id: usize) -> Result<&Arc<Store>> {
        self.stores.get(store_id).ok_or(StoreError::InvalidStoreId {
            store_id,
            limit: self.stores.len(),
        })
    }

    /// Open a new session on a store.
    ///
    /// # Errors
    ///
    /// `InvalidStoreId` for an id out of range, `SessionLimitReached` when
    /// the store already has `concurrency_limit` sessions open.
    pub fn open(&self, store_id: usize) -> Result<SessionHandle> {
        let store = self
            .store(store_id)
            .inspect_err(|e| warn!(error = %e, "open rejected"))?;
        let session = store.open(self.ids.get_next())?;
        self.live_sessions.fetch_add(1, Ordering::AcqRel);
        Ok(session.handle())
    }

    /// Resolve a handle to its live session.
    ///
    /// # Errors
    ///
    /// Returns `UnknownHandle` for closed, stale or foreign handles.
    pub fn session(&self, handle: SessionHandle) -> Result<Arc<Session>> {
        self.stores
            .get(handle.store_id())
            .and_then(|store| store.sessions().get(handle))
            .ok_or(StoreError::UnknownHandle(handle))
    }

    /// Read up to `max_count` bytes at the session's cursor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownHandle` for handles that are not open.
    pub fn read(&self, handle: SessionHandle, max_count: usize) -> Result<Vec<u8>> {
        self.session(handle)?.read(max_count)
    }

    /// Write `bytes` at the session's cursor.
    ///
    /// # Errors
    ///
    /// `WriteFailure` with the count stored before the store could not grow,
    /// or with zero and `UnknownHandle` for handles that are not open.
    pub fn write(
        &self,
        handle: SessionHandle,
        bytes: &[u8],
    ) -> std::result::Result<usize, WriteFailure> {
        self.session(handle)?.write(bytes)
    }

    /// Close a session and free its slot.
    ///
    /// Closing a handle that is not open does nothing.
    pub fn close(&self, handle: SessionHandle) {
        let closed = self
            .stores
            .get(handle.store_id())
            .and_then(|store| store.sessions().deregister(handle));
        if closed.is_some() {
            self.live_sessions.fetch_sub(1, Ordering::AcqRel);
            debug!(store = handle.store_id(), session = ?handle, "session closed");
        } else {
            log::warn!("close: handle {handle:?} is not open");
        }
    }

    /// Grow or shrink a store explicitly.
    ///
    /// # Errors
    ///
    /// `InvalidStoreId`, or any error from [`Store::resize`].
    pub fn resize(&self, store_id: usize, new_capacity: usize) -> Result<()> {
        self.store(store_id)?.resize(new_capacity)
    }

    /// Wrap a session in an `embedded_io` reader/writer.
    ///
    /// # Errors
    ///
    /// Returns `UnknownHandle` for handles that are not open.
    pub fn session_io(&self, handle: SessionHandle) -> Result<SessionIo> {
        Ok(SessionIo::new(self.session(handle)?))
    }

    /// Number of sessions open across all stores
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> Vec<StoreStats> {
        self.stores.iter().map(|store| store.stats()).collect()
    }

    /// Close every session and release every store buffer.
    #[must_use = "the report says what was released"]
    pub fn shutdown(self) -> ShutdownReport {
        let report = self.release_all();
        info!(
            stores = report.stores,
            sessions = report.sessions_closed,
            bytes = report.bytes_released,
            "store registry shut down"
        );
        report
    }

    fn release_all(&self) -> ShutdownReport {
        let mut report = ShutdownReport {
            stores: self.stores.len(),
            sessions_closed: 0,
            bytes_released: 0,
        };
        for store in &self.stores {
            let (closed, released) = store.teardown();
            report.sessions_closed += closed;
            report.bytes_released += released;
        }
        self.live_sessions.store(0, Ordering::Release);
        report
    }
}

impl Drop for StoreRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("config", &self.config)
            .field("live_sessions", &self.live_sessions())
            .field("stores", &self.stores)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> StoreRegistry {
        StoreRegistry::new(
            RegistryConfig::default()
                .with_device_limit(2)
                .with_concurrency_limit(2),
        )
        .unwrap()
    }

    #[test]
    fn test_store_id_bound_is_strict() {
        let registry = small();
        assert!(registry.open(1).is_ok());
        assert_eq!(
            registry.open(2),
            Err(StoreError::InvalidStoreId { store_id: 2, limit: 2 })
        );
    }

    #[test]
    fn test_live_sessions_counter() {
        let registry = small();
        let a = registry.open(0).unwrap();
        let b = registry.open(1).unwrap();
        assert_eq!(registry.live_sessions(), 2);

        registry.close(a);
        registry.close(a);
        assert_eq!(registry.live_sessions(), 1);
        registry.close(b);
        assert_eq!(registry.live_sessions(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let registry = small();
        let a = registry.open(0).unwrap();
        registry.close(a);
        let b = registry.open(0).unwrap();
        assert_eq!(a.slot(), b.slot());
        assert_ne!(a, b);
        assert!(matches!(registry.read(a, 1), Err(StoreError::UnknownHandle(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = StoreRegistry::new(RegistryConfig::default().with_device_limit(0)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_shutdown_report() {
        let registry = small();
        registry.open(0).unwrap();
        registry.open(1).unwrap();
        let handle = registry.open(1).unwrap();
        registry.write(handle, &[7; 20]).unwrap();

        let report = registry.shutdown();
        assert_eq!(
            report,
            ShutdownReport {
                stores: 2,
                sessions_closed: 3,
                bytes_released: 16 + 20,
            }
        );
    }
}
