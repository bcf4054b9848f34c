#![forbid(unsafe_code)]

//! Scroll/keyboard exit trigger.
//!
//! While the gate is `Geometrical`, downward wheel motion accumulates into a
//! [`ScrollAccumulator`]. Reaching the threshold requests the exit exactly
//! once per episode. `ArrowDown`, `PageDown`, and `Space` request the exit
//! directly, without a threshold. Keys chorded with `Ctrl`, `Alt`, or `Meta`
//! are left to the browser.

use warpgate_core::event::{KeyCode, KeyEvent, WheelEvent};

/// Accumulated wheel distance that requests the exit.
pub const EXIT_THRESHOLD: i32 = 100;

/// Signed wheel distance with a one-shot threshold.
///
/// `value = max(0, value + delta)`: upward motion drains the accumulator but
/// never below zero, and cannot undo a crossing that already fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAccumulator {
    value: i32,
    threshold: i32,
    fired: bool,
}

impl Default for ScrollAccumulator {
    fn default() -> Self {
        Self::new(EXIT_THRESHOLD)
    }
}

impl ScrollAccumulator {
    /// Create an empty accumulator.
    ///
    /// Thresholds below 1 are raised to 1, so upward motion alone never
    /// fires.
    #[must_use]
    pub const fn new(threshold: i32) -> Self {
        Self {
            value: 0,
            threshold: if threshold < 1 { 1 } else { threshold },
            fired: false,
        }
    }

    /// Add a wheel delta. Returns `true` on the event that reaches the
    /// threshold, and never again until [`reset`](Self::reset).
    pub fn push(&mut self, delta: i32) -> bool {
        if self.fired {
            return false;
        }
        self.value = self.value.saturating_add(delta).max(0);
        if self.value >= self.threshold {
            self.fired = true;
            return true;
        }
        false
    }

    /// Current accumulated distance.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.value
    }

    /// Threshold that fires the exit.
    #[must_use]
    pub const fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Whether the threshold has been reached this episode.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }

    /// Discard all accumulated state.
    pub fn reset(&mut self) {
        self.value = 0;
        self.fired = false;
    }
}

/// Decides when to leave `Geometrical`.
#[derive(Debug, Clone, Default)]
pub struct ExitTrigger {
    accumulator: ScrollAccumulator,
}

impl ExitTrigger {
    /// Create a trigger with the given wheel threshold.
    #[must_use]
    pub const fn new(threshold: i32) -> Self {
        Self {
            accumulator: ScrollAccumulator::new(threshold),
        }
    }

    /// Feed a wheel event. Returns `true` when the exit should be requested.
    pub fn on_wheel(&mut self, wheel: WheelEvent) -> bool {
        self.accumulator.push(wheel.delta_y)
    }

    /// Feed a key event. Returns `true` for the exit bypass keys pressed
    /// without a command modifier.
    #[must_use]
    pub fn on_key(&self, key: KeyEvent) -> bool {
        key.is_down() && !key.is_chord() && is_exit_key(key.code)
    }

    /// Accumulator state for diagnostics.
    #[must_use]
    pub const fn accumulator(&self) -> &ScrollAccumulator {
        &self.accumulator
    }

    /// Start a fresh episode.
    pub fn reset(&mut self) {
        self.accumulator.reset();
    }
}

/// Keys that request the exit without a wheel threshold.
#[must_use]
pub const fn is_exit_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Down | KeyCode::PageDown | KeyCode::Space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpgate_core::event::{KeyEventKind, Modifiers};

    #[test]
    fn fires_on_event_completing_threshold() {
        let mut acc = ScrollAccumulator::default();
        assert!(!acc.push(60));
        assert!(acc.push(40));
        assert_eq!(acc.value(), 100);
    }

    #[test]
    fn one_short_never_fires() {
        let mut acc = ScrollAccumulator::default();
        for _ in 0..99 {
            assert!(!acc.push(1));
        }
        assert_eq!(acc.value(), 99);
        assert!(!acc.has_fired());
    }

    #[test]
    fn fires_only_once() {
        let mut acc = ScrollAccumulator::default();
        assert!(acc.push(150));
        assert!(!acc.push(150));
        assert!(!acc.push(-500));
        assert!(!acc.push(150));
        assert!(acc.has_fired());
    }

    #[test]
    fn upward_motion_floors_at_zero() {
        let mut acc = ScrollAccumulator::default();
        acc.push(30);
        acc.push(-80);
        assert_eq!(acc.value(), 0);
        assert!(!acc.push(99));
        assert!(acc.push(1));
    }

    #[test]
    fn upward_motion_drains_partially() {
        let mut acc = ScrollAccumulator::default();
        acc.push(80);
        acc.push(-30);
        assert_eq!(acc.value(), 50);
        assert!(!acc.push(49));
        assert!(acc.push(1));
    }

    #[test]
    fn reset_rearms() {
        let mut acc = ScrollAccumulator::default();
        assert!(acc.push(100));
        acc.reset();
        assert_eq!(acc.value(), 0);
        assert!(acc.push(100));
    }

    #[test]
    fn exit_keys() {
        let trigger = ExitTrigger::default();
        assert!(trigger.on_key(KeyEvent::new(KeyCode::Down)));
        assert!(trigger.on_key(KeyEvent::new(KeyCode::PageDown)));
        assert!(trigger.on_key(KeyEvent::new(KeyCode::Space)));
        assert!(!trigger.on_key(KeyEvent::new(KeyCode::Enter)));
        assert!(!trigger.on_key(KeyEvent::new(KeyCode::Up)));
        assert!(!trigger.on_key(KeyEvent::new(KeyCode::Down).with_kind(KeyEventKind::Release)));
    }

    #[test]
    fn chorded_exit_keys_ignored() {
        let trigger = ExitTrigger::default();
        let ctrl_down = KeyEvent::new(KeyCode::Down).with_modifiers(Modifiers::CTRL);
        let meta_space = KeyEvent::new(KeyCode::Space).with_modifiers(Modifiers::SUPER);
        let shift_space = KeyEvent::new(KeyCode::Space).with_modifiers(Modifiers::SHIFT);
        assert!(!trigger.on_key(ctrl_down));
        assert!(!trigger.on_key(meta_space));
        assert!(trigger.on_key(shift_space));
    }

    #[test]
    fn non_positive_threshold_clamped() {
        let mut acc = ScrollAccumulator::new(0);
        assert_eq!(acc.threshold(), 1);
        assert!(!acc.push(-5));
        assert!(!acc.push(0));
        assert!(acc.push(1));

        let mut trigger = ExitTrigger::new(-20);
        assert!(!trigger.on_wheel(WheelEvent::new(-40)));
        assert_eq!(trigger.accumulator().threshold(), 1);
    }

    #[test]
    fn trigger_wheel_uses_custom_threshold() {
        let mut trigger = ExitTrigger::new(10);
        assert!(!trigger.on_wheel(WheelEvent::new(9)));
        assert!(trigger.on_wheel(WheelEvent::new(1)));
        assert!(trigger.accumulator().has_fired());
        trigger.reset();
        assert!(!trigger.accumulator().has_fired());
    }
}
