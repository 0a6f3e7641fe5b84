//! Raw buffer allocation
//!
//! An allocator only hands out and takes back byte regions. Growth policy,
//! copying and locking belong to [`Store`](crate::store::Store).

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, StoreError};

/// An owned, zero-filled byte region
pub type Region = Box<[u8]>;

/// Source of buffer memory for stores
///
/// `acquire` must either return a region of exactly `size` bytes or fail
/// without side effects; a store relies on that to keep its old buffer valid
/// when growth fails.
pub trait BufferAllocator: Send + Sync {
    /// Allocate a zero-filled region of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailure` when the memory is not available.
    fn acquire(&self, size: usize) -> Result<Region>;

    /// Give back a region previously returned by `acquire`.
    fn release(&self, region: Region);
}

/// Heap-backed allocator
///
/// Uses fallible reservation so that exhaustion is reported as an error
/// instead of aborting the process.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    live_bytes: AtomicUsize,
}

impl HeapAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently handed out and not yet released
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }
}

impl BufferAllocator for HeapAllocator {
    fn acquire(&self, size: usize) -> Result<Region> {
        let mut region = Vec::new();
        region
            .try_reserve_exact(size)
            .map_err(|_| StoreError::AllocationFailure { requested: size })?;
        region.resize(size, 0);
        self.live_bytes.fetch_add(size, Ordering::Relaxed);
        Ok(region.into_boxed_slice())
    }

    fn release(&self, region: Region) {
        self.live_bytes.fetch_sub(region.len(), Ordering::Relaxed);
        drop(region);
    }
}
