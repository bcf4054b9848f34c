#![forbid(unsafe_code)]

//! `warpgate-web` drives the entry gate from a browser-like host.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment pushes wheel, key, and
//!   scroll events and reads back effects.
//! - **Deterministic time**: the host advances a monotonic clock explicitly.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! This crate does not bind to `wasm-bindgen`. [`page::GatePage`] is the
//! building block a JS shim wraps.

#[cfg(feature = "tracing-subscriber")]
pub mod logging;
pub mod page;

use core::time::Duration;

pub use page::{GatePage, PageError, StepResult};

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time. Moving backwards is ignored.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clock_is_monotonic() {
        let mut clock = DeterministicClock::new();
        clock.advance(Duration::from_millis(16));
        clock.set(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(16));
        clock.set(Duration::from_millis(40));
        assert_eq!(clock.now(), Duration::from_millis(40));
    }
}
