//! Engine configuration.
//!
//! Everything has a default, so an empty config file (or no file at all)
//! yields the built-in basic loop with transport unit numbers starting at
//! 10001.

use crate::layout::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Transport unit numbers are assigned above this base by default.
pub const DEFAULT_TRANSPORT_UNIT_BASE: u32 = 10_000;

/// Default capacity of the engine's event ring buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tunables of a single engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Last number considered "used" before the first retrieval. The counter
    /// is incremented before each assignment, so the first container gets
    /// `transport_unit_base + 1`.
    pub transport_unit_base: u32,
    /// Number of events retained before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transport_unit_base: DEFAULT_TRANSPORT_UNIT_BASE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// A complete engine setup: tunables plus the layout table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub engine: EngineConfig,
    pub layout: LayoutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.engine.transport_unit_base, 10_000);
        assert_eq!(config.engine.event_capacity, 256);
        assert_eq!(config.layout, LayoutConfig::basic_loop());
    }
}
