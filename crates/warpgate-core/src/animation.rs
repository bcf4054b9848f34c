#![forbid(unsafe_code)]

//! Composable animation primitives.
//!
//! Time-based animations that produce normalized `f32` values (0.0–1.0).
//! Time is always supplied by the caller as a [`Duration`] delta, so the
//! same animation advances identically at 30 fps, 144 fps, or under a
//! deterministic test clock.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out (fast start, slow end).
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A time-based animation producing values in [0.0, 1.0].
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Current output value, clamped to [0.0, 1.0].
    fn value(&self) -> f32;

    /// Reset the animation to its initial state.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Fade
// ---------------------------------------------------------------------------

/// Linear progression from 0.0 to 1.0 over a duration, with configurable easing.
///
/// Tracks elapsed time as [`Duration`] internally for precise accumulation
/// (no floating-point drift).
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    elapsed: Duration,
    duration: Duration,
    easing: EasingFn,
}

impl Fade {
    /// Create a fade with the given duration and default linear easing.
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            easing: linear,
        }
    }

    /// Set the easing function.
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Raw linear progress (before easing), in [0.0, 1.0].
    pub fn raw_progress(&self) -> f32 {
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }

    /// Time past the end of the fade.
    pub fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.duration)
    }
}

impl Animation for Fade {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        (self.easing)(self.raw_progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Rise, hold, fall.
///
/// `value()` climbs 0 → 1 through `rise`, stays at 1 for `hold`, then
/// returns 1 → 0 through `fall`. Overshoot from one stage is forwarded into
/// the next, so a single large `tick` lands on the same value as many small
/// ones.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    rise: Fade,
    hold: Duration,
    held: Duration,
    fall: Fade,
}

impl Envelope {
    /// Create an envelope from its three stages.
    pub fn new(rise: Fade, hold: Duration, fall: Fade) -> Self {
        Self {
            rise,
            hold,
            held: Duration::ZERO,
            fall,
        }
    }

    /// Whether the envelope is still rising.
    pub fn is_rising(&self) -> bool {
        !self.rise.is_complete()
    }

    /// Whether the envelope has started to fall.
    pub fn is_falling(&self) -> bool {
        self.rise.is_complete() && self.held >= self.hold && !self.fall.is_complete()
    }
}

impl Animation for Envelope {
    fn tick(&mut self, dt: Duration) {
        let mut carry = dt;
        if !self.rise.is_complete() {
            self.rise.tick(carry);
            if !self.rise.is_complete() {
                return;
            }
            carry = self.rise.overshoot();
        }
        if self.held < self.hold {
            let room = self.hold - self.held;
            if carry < room {
                self.held += carry;
                return;
            }
            self.held = self.hold;
            carry -= room;
        }
        if !carry.is_zero() {
            self.fall.tick(carry);
        }
    }

    fn is_complete(&self) -> bool {
        self.rise.is_complete() && self.held >= self.hold && self.fall.is_complete()
    }

    fn value(&self) -> f32 {
        if !self.rise.is_complete() {
            self.rise.value()
        } else if self.held < self.hold {
            1.0
        } else {
            1.0 - self.fall.value()
        }
    }

    fn reset(&mut self) {
        self.rise.reset();
        self.held = Duration::ZERO;
        self.fall.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
