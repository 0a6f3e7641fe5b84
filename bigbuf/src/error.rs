//! Error types for store, session and registry operations

use crate::session::SessionHandle;

/// Result type alias for bigbuf operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by the registry, stores and sessions
///
/// No variant is ever produced after a partial buffer swap: when an
/// operation fails, the store it addressed is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store id {store_id} (stores: {limit})")]
    InvalidStoreId { store_id: usize, limit: usize },

    #[error("store {store_id} already has {limit} open sessions")]
    SessionLimitReached { store_id: usize, limit: usize },

    #[error("shrinking to {requested} bytes would cut off a session at offset {cursor}")]
    WouldTruncateActiveCursor { requested: usize, cursor: usize },

    #[error("requested capacity {requested} exceeds the maximum of {max} bytes")]
    ExceedsMaxCapacity { requested: usize, max: usize },

    #[error("failed to allocate {requested} bytes")]
    AllocationFailure { requested: usize },

    #[error("unknown or closed session {0:?}")]
    UnknownHandle(SessionHandle),

    #[error("invalid configuration: {parameter} - {message}")]
    InvalidConfig { parameter: String, message: String },
}

impl StoreError {
    /// Create an invalid configuration error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may succeed by retrying later
    ///
    /// A full session table frees up when another session closes, and memory
    /// pressure is transient. Everything else fails the same way on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SessionLimitReached { .. } | Self::AllocationFailure { .. }
        )
    }
}

/// A write that stopped early
///
/// `written` bytes were stored (and the cursor advanced past them) before
/// `error` stopped the write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("write failed after {written} bytes: {error}")]
pub struct WriteFailure {
    pub written: usize,
    #[source]
    pub error: StoreError,
}

impl WriteFailure {
    #[must_use]
    pub fn new(written: usize, error: StoreError) -> Self {
        Self { written, error }
    }
}

impl From<StoreError> for WriteFailure {
    fn from(error: StoreError) -> Self {
        Self::new(0, error)
    }
}

impl embedded_io::Error for StoreError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::InvalidStoreId { .. } | Self::InvalidConfig { .. } => {
                embedded_io::ErrorKind::InvalidInput
            }
            Self::UnknownHandle(_) => embedded_io::ErrorKind::NotConnected,
            Self::ExceedsMaxCapacity { .. } | Self::AllocationFailure { .. } => {
                embedded_io::ErrorKind::OutOfMemory
            }
            Self::SessionLimitReached { .. } | Self::WouldTruncateActiveCursor { .. } => {
                embedded_io::ErrorKind::Other
            }
        }
    }
}
