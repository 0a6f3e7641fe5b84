use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe generator of session serial numbers
///
/// Serials start at 1 and are never handed out twice, so a handle that
/// outlived its session cannot match whatever session reuses its slot.
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicU64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the next unique ID
    pub fn get_next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_increasing() {
        let ids = IdGen::new();
        assert_eq!(ids.get_next(), 1);
        assert_eq!(ids.get_next(), 2);
        assert_eq!(ids.get_next(), 3);
    }
}
