//! Named, growable byte stores shared by concurrent sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  StoreRegistry                      │
//! │  - fixed set of stores by id        │
//! │  - open / read / write / close      │
//! └─────────────────────────────────────┘
//!          │ one per store id
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Store                              │
//! │  - RwLock<buffer, used>             │
//! │  - copy-and-swap resize             │
//! │  - SessionTable (bounded slots)     │
//! └─────────────────────────────────────┘
//!          │ buffers come from
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  BufferAllocator                    │
//! │  - acquire(size) / release(region)  │
//! └─────────────────────────────────────┘
//! ```
//!
//! Each session keeps its own cursor into its store. Reads stop at the
//! end of the data written so far; writes grow the buffer on demand up to
//! the configured maximum.
//!
//! # Example
//!
//! ```
//! use bigbuf::{RegistryConfig, StoreRegistry};
//!
//! let registry = StoreRegistry::new(RegistryConfig::default()).unwrap();
//! let writer = registry.open(0).unwrap();
//! let reader = registry.open(0).unwrap();
//!
//! assert_eq!(registry.write(writer, b"AAAAAAAAAAAAAAAAAAAA"), Ok(20));
//! assert_eq!(registry.read(reader, 20).unwrap(), b"AAAAAAAAAAAAAAAAAAAA");
//! assert!(registry.read(reader, 1).unwrap().is_empty());
//!
//! registry.close(reader);
//! registry.close(writer);
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod idgen;
pub mod io;
pub mod registry;
pub mod session;
pub mod session_table;
pub mod store;

pub use allocator::{BufferAllocator, HeapAllocator, Region};
pub use config::{GrowthPolicy, RegistryConfig};
pub use error::{Result, StoreError, WriteFailure};
pub use io::SessionIo;
pub use registry::{ShutdownReport, StoreRegistry};
pub use session::{Session, SessionHandle};
pub use session_table::SessionTable;
pub use store::{Store, StoreStats};
