#![forbid(unsafe_code)]

//! Gate configuration.

use crate::bus::WarpRequest;
use crate::cascade::CascadeTimings;
use crate::trigger::EXIT_THRESHOLD;

/// Default session storage key.
pub const DEFAULT_STORAGE_KEY: &str = "warpgate:intro";

/// Configuration for a [`TransitionController`](crate::TransitionController).
///
/// Integrators normally set only `remember` and `storage_key`; the rest
/// defaults to the tuned constants of the entry experience.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    /// Skip the gate on revisits within the session, and record passes.
    pub remember: bool,
    /// Session storage key for the "done" flag.
    pub storage_key: String,
    /// Fallback cascade delays.
    pub timings: CascadeTimings,
    /// Accumulated wheel distance that requests the exit.
    pub exit_threshold: i32,
    /// Warp published on the exit edge.
    pub exit_warp: WarpRequest,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            remember: true,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            timings: CascadeTimings::default(),
            exit_threshold: EXIT_THRESHOLD,
            exit_warp: WarpRequest::default(),
        }
    }
}

impl GateConfig {
    /// Config with a custom storage key.
    #[must_use]
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            ..Default::default()
        }
    }

    /// Config that never reads or writes the session flag.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            remember: false,
            ..Default::default()
        }
    }

    /// Set whether the gate is remembered for the session.
    #[must_use]
    pub fn with_remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
    }

    /// Set the fallback cascade delays.
    #[must_use]
    pub fn with_timings(mut self, timings: CascadeTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Set the wheel exit threshold.
    #[must_use]
    pub fn with_exit_threshold(mut self, threshold: i32) -> Self {
        self.exit_threshold = threshold.max(1);
        self
    }

    /// Set the warp published on exit.
    #[must_use]
    pub fn with_exit_warp(mut self, warp: WarpRequest) -> Self {
        self.exit_warp = warp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = GateConfig::default();
        assert!(config.remember);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.exit_threshold, 100);
        assert_eq!(config.exit_warp.factor, 8.0);
        assert_eq!(config.exit_warp.duration, Duration::from_millis(1200));
    }

    #[test]
    fn builders() {
        let config = GateConfig::new("site:intro")
            .with_remember(false)
            .with_exit_threshold(0)
            .with_exit_warp(WarpRequest::new(3.0, Duration::from_millis(800)));
        assert_eq!(config.storage_key, "site:intro");
        assert!(!config.remember);
        assert_eq!(config.exit_threshold, 1);
        assert_eq!(config.exit_warp.factor, 3.0);
        assert!(!GateConfig::ephemeral().remember);
    }
}
