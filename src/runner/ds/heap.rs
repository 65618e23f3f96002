//! Allocation budget for the managed runtime.
//!
//! Every object, array and string an entry point hands back is charged to
//! the heap. The facade resets it before each invocation, so the limit bounds
//! what a single call may build rather than the lifetime total.

use serde::Deserialize;

use crate::runner::ds::error::JErrorType;

/// `[heap]` table of the runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HeapConfig {
    /// Per-invocation limit in bytes; absent means unlimited.
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

impl HeapConfig {
    pub fn with_limit(max_bytes: usize) -> Self {
        HeapConfig {
            max_bytes: Some(max_bytes),
        }
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    limit: Option<usize>,
    in_use: usize,
    peak: usize,
}

impl Heap {
    pub fn new(config: HeapConfig) -> Self {
        Heap {
            limit: config.max_bytes,
            in_use: 0,
            peak: 0,
        }
    }

    /// Adds `bytes` to the running total, or fails with a `RangeError` and
    /// leaves the total unchanged when that would pass the limit.
    pub fn charge(&mut self, bytes: usize) -> Result<(), JErrorType> {
        let total = self.in_use.saturating_add(bytes);
        if let Some(limit) = self.limit {
            if total > limit {
                return Err(JErrorType::RangeError(format!(
                    "invocation needs {} bytes, budget is {}",
                    total, limit
                )));
            }
        }
        self.in_use = total;
        self.peak = self.peak.max(total);
        Ok(())
    }

    /// Starts a new invocation. The peak survives.
    pub fn reset(&mut self) {
        self.in_use = 0;
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Largest total charged by any single invocation so far.
    pub fn high_water_mark(&self) -> usize {
        self.peak
    }

    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.in_use))
    }
}
