//! Registry configuration
//!
//! The limits that were compile-time constants in a device driver are plain
//! values here, so tests can run with two stores and a three-byte buffer.

use serde::Deserialize;

use crate::error::{Result, StoreError};

/// Number of stores created at startup
pub const DEFAULT_DEVICE_LIMIT: usize = 4;

/// Concurrent sessions allowed per store
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 8;

/// Capacity of a freshly created store buffer
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Hard cap on a single store buffer (8 MiB)
pub const DEFAULT_MAX_CAPACITY: usize = 8 * 1024 * 1024;

/// How a full buffer is enlarged when a write needs more room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPolicy {
    /// Grow by exactly the number of bytes still to be written.
    ///
    /// Many small writes cause one reallocation each.
    #[default]
    Exact,
    /// Grow to at least twice the current capacity.
    Doubling,
}

impl GrowthPolicy {
    /// Target capacity for a full buffer of `capacity` bytes with `remaining`
    /// bytes left to write.
    ///
    /// `Doubling` never pushes a demand that fits under `max_capacity` over it.
    #[must_use]
    pub fn target(self, capacity: usize, remaining: usize, max_capacity: usize) -> usize {
        let demand = capacity.saturating_add(remaining);
        match self {
            Self::Exact => demand,
            Self::Doubling => {
                let doubled = capacity.saturating_mul(2).max(demand);
                if demand <= max_capacity {
                    doubled.min(max_capacity)
                } else {
                    doubled
                }
            }
        }
    }
}

/// Limits applied by a [`StoreRegistry`](crate::registry::StoreRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub device_limit: usize,
    pub concurrency_limit: usize,
    pub initial_capacity: usize,
    pub max_capacity: usize,
    pub growth: GrowthPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            device_limit: DEFAULT_DEVICE_LIMIT,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            growth: GrowthPolicy::default(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn with_device_limit(mut self, device_limit: usize) -> Self {
        self.device_limit = device_limit;
        self
    }

    #[must_use]
    pub fn with_concurrency_limit(mut self, concurrency_limit: usize) -> Self {
        self.concurrency_limit = concurrency_limit;
        self
    }

    #[must_use]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    #[must_use]
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    #[must_use]
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Parse a JSON object; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the JSON is malformed, has unknown keys,
    /// or describes limits that fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [`from_json_str`](Self::from_json_str), reading from `reader`.
    ///
    /// # Errors
    ///
    /// See [`from_json_str`](Self::from_json_str).
    pub fn from_json_reader(reader: impl std::io::Read) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| StoreError::invalid_config("json", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the limits describe a usable registry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.device_limit == 0 {
            return Err(StoreError::invalid_config("device_limit", "must be at least 1"));
        }
        if self.concurrency_limit == 0 {
            return Err(StoreError::invalid_config(
                "concurrency_limit",
                "must be at least 1",
            ));
        }
        if self.initial_capacity == 0 {
            return Err(StoreError::invalid_config(
                "initial_capacity",
                "must be at least 1",
            ));
        }
        if self.initial_capacity > self.max_capacity {
            return Err(StoreError::invalid_config(
                "initial_capacity",
                format!(
                    "{} is larger than max_capacity {}",
                    self.initial_capacity, self.max_capacity
                ),
            ));
        }
        Ok(())
    }
}
