//! Controller settings.

use std::time::Duration;

use fingerlock_core::constants::{
    DEFAULT_CAPTURE_POLL_MS, DEFAULT_CAPTURE_TIMEOUT_MS, DEFAULT_RELAY_ACTIVE_LOW,
    DEFAULT_REMOVAL_POLL_MS, DEFAULT_TICK_MS, DEFAULT_UNLOCK_HOLD_MS,
};

/// Loop and wait durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause between main loop iterations.
    pub tick: Duration,

    /// How long an enrollment waits for each finger placement.
    pub capture_timeout: Duration,

    /// Poll interval while waiting for a finger.
    pub capture_poll: Duration,

    /// Poll interval while waiting for the finger to be lifted.
    pub removal_poll: Duration,

    /// How long the door stays unlocked after a match.
    pub unlock_hold: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            capture_timeout: Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS),
            capture_poll: Duration::from_millis(DEFAULT_CAPTURE_POLL_MS),
            removal_poll: Duration::from_millis(DEFAULT_REMOVAL_POLL_MS),
            unlock_hold: Duration::from_millis(DEFAULT_UNLOCK_HOLD_MS),
        }
    }
}

/// Everything the door controller needs besides its devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub timing: Timing,

    /// Relay wiring: `true` when driving the line low unlocks the door.
    pub active_low: bool,

    /// Emit a status line when a presented finger is not recognised.
    pub report_rejections: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            active_low: DEFAULT_RELAY_ACTIVE_LOW,
            report_rejections: false,
        }
    }
}

impl ControllerConfig {
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    pub fn with_report_rejections(mut self, report: bool) -> Self {
        self.report_rejections = report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = Timing::default();
        assert_eq!(timing.tick, Duration::from_millis(100));
        assert_eq!(timing.capture_timeout, Duration::from_secs(10));
        assert_eq!(timing.unlock_hold, Duration::from_secs(10));
    }

    #[test]
    fn test_default_config_is_silent_and_active_low() {
        let config = ControllerConfig::default();
        assert!(config.active_low);
        assert!(!config.report_rejections);
    }

    #[test]
    fn test_builder_methods() {
        let config = ControllerConfig::default()
            .with_active_low(false)
            .with_report_rejections(true);
        assert!(!config.active_low);
        assert!(config.report_rejections);
    }
}
