#![forbid(unsafe_code)]

//! Warp speed curve.
//!
//! A warp drives a single speed multiplier through three phases:
//!
//! ```text
//! speed
//! factor ┤    ┌──────────────┐
//!        │   ╱                ╲
//!        │  ╱                  ╲
//!      1 ┼─┘                    └──
//!        └─┬───┬──────────────┬────┬─ time
//!          0  250ms      dur-400ms dur
//!           RampUp    Hold     RampDown
//! ```
//!
//! Everything here is pure: the curve is sampled against elapsed time, never
//! against frame counts, so the trajectory is frame-rate independent.
//!
//! # Invariants
//!
//! 1. `speed_at` is exactly `1.0` at the start of RampUp and the end of RampDown.
//! 2. Speed is non-decreasing through RampUp and non-increasing through RampDown.
//! 3. Hold length is `max(0, duration - 650ms)`; the ramps are never shortened.

use std::time::Duration;

/// Fixed length of the ramp-up phase.
pub const RAMP_UP: Duration = Duration::from_millis(250);

/// Fixed length of the ramp-down phase.
pub const RAMP_DOWN: Duration = Duration::from_millis(400);

/// Speed above which the streak overlay is shown.
pub const STREAK_THRESHOLD: f32 = 1.2;

/// Phase of a warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WarpPhase {
    /// No warp running; speed is 1.
    #[default]
    Idle,
    /// Linear climb from 1 to the factor.
    RampUp,
    /// Speed held at the factor.
    Hold,
    /// Linear descent from the factor back to 1.
    RampDown,
}

impl WarpPhase {
    /// Whether this phase belongs to an active warp.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Speed multiplier `phase_elapsed` into `phase`.
///
/// `phase_elapsed` is measured from the start of `phase`, not from the start
/// of the warp. Values past the end of a ramp clamp to the ramp's end value.
#[must_use]
pub fn speed_at(phase_elapsed: Duration, phase: WarpPhase, factor: f32) -> f32 {
    match phase {
        WarpPhase::Idle => 1.0,
        WarpPhase::RampUp => lerp(1.0, factor, progress(phase_elapsed, RAMP_UP)),
        WarpPhase::Hold => factor,
        WarpPhase::RampDown => lerp(factor, 1.0, progress(phase_elapsed, RAMP_DOWN)),
    }
}

/// Whether the streak overlay should be visible at `speed`.
#[must_use]
pub fn streaks_visible(speed: f32) -> bool {
    speed > STREAK_THRESHOLD
}

fn progress(elapsed: Duration, span: Duration) -> f32 {
    if span.is_zero() {
        return 1.0;
    }
    let t = elapsed.as_secs_f64() / span.as_secs_f64();
    (t as f32).clamp(0.0, 1.0)
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    // Endpoints are returned exactly so the curve starts and ends on 1.0.
    if t <= 0.0 {
        from
    } else if t >= 1.0 {
        to
    } else {
        (from + (to - from) * t).clamp(from.min(to), from.max(to))
    }
}

/// The full three-phase curve for one warp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpCurve {
    factor: f32,
    hold: Duration,
}

impl WarpCurve {
    /// Build the curve for a warp of `factor` lasting `duration` in total.
    ///
    /// Factors below 1 are clamped to 1 so the speed never drops under its
    /// baseline.
    #[must_use]
    pub fn new(factor: f32, duration: Duration) -> Self {
        let factor = if factor.is_finite() {
            factor.max(1.0)
        } else {
            1.0
        };
        Self {
            factor,
            hold: duration.saturating_sub(RAMP_UP + RAMP_DOWN),
        }
    }

    /// Peak speed multiplier.
    #[must_use]
    pub const fn factor(&self) -> f32 {
        self.factor
    }

    /// Length of the hold phase.
    #[must_use]
    pub const fn hold(&self) -> Duration {
        self.hold
    }

    /// Time from the start of RampUp to the end of RampDown.
    #[must_use]
    pub fn total(&self) -> Duration {
        RAMP_UP + self.hold + RAMP_DOWN
    }

    /// Phase active `elapsed` after the warp started.
    #[must_use]
    pub fn phase_at(&self, elapsed: Duration) -> WarpPhase {
        self.locate(elapsed).0
    }

    /// Phase and speed `elapsed` after the warp started.
    #[must_use]
    pub fn sample(&self, elapsed: Duration) -> (WarpPhase, f32) {
        let (phase, into) = self.locate(elapsed);
        (phase, speed_at(into, phase, self.factor))
    }

    fn locate(&self, elapsed: Duration) -> (WarpPhase, Duration) {
        let hold_start = RAMP_UP;
        let down_start = RAMP_UP + self.hold;
        if elapsed < hold_start {
            (WarpPhase::RampUp, elapsed)
        } else if elapsed < down_start {
            (WarpPhase::Hold, elapsed - hold_start)
        } else if elapsed < self.total() {
            (WarpPhase::RampDown, elapsed - down_start)
        } else {
            (WarpPhase::Idle, Duration::ZERO)
        }
    }
}
