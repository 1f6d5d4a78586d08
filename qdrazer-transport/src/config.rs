//! Flow-control tuning

use serde::{Deserialize, Serialize};

/// Default timing constants
pub mod timing {
    /// Delay between sending a frame and the first read (ms)
    pub const DEFAULT_COMMAND_DELAY_MS: u64 = 5;
    /// Delay between readiness polls after a timed-out read (ms)
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;
    /// Largest accepted wait power (2^8 = 256 read attempts)
    pub const MAX_WAIT_POWER: u8 = 8;
}

/// Timing knobs for `FlowControlTransport`.
///
/// Deserializable so a front end can embed it in its own configuration
/// file; missing fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Sleep after each send before reading the reply (0 disables)
    pub command_delay_ms: u64,
    /// Sleep before each extra read attempt within the wait budget
    pub poll_interval_ms: u64,
    /// Upper bound applied to any requested `WaitPower`
    pub max_wait_power: u8,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            command_delay_ms: timing::DEFAULT_COMMAND_DELAY_MS,
            poll_interval_ms: timing::DEFAULT_POLL_INTERVAL_MS,
            max_wait_power: timing::MAX_WAIT_POWER,
        }
    }
}

impl FlowConfig {
    /// No sleeping at all; for loopback and tests.
    pub fn immediate() -> Self {
        Self {
            command_delay_ms: 0,
            poll_interval_ms: 0,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: FlowConfig = serde_json::from_str(r#"{"poll_interval_ms": 50}"#).unwrap();
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.command_delay_ms, timing::DEFAULT_COMMAND_DELAY_MS);
        assert_eq!(config.max_wait_power, timing::MAX_WAIT_POWER);
    }

    #[test]
    fn immediate_disables_sleeps() {
        let config = FlowConfig::immediate();
        assert_eq!(config.command_delay_ms, 0);
        assert_eq!(config.poll_interval_ms, 0);
    }
}
