#![forbid(unsafe_code)]

//! Warp animator.
//!
//! [`WarpAnimator`] owns the background speed multiplier and drives it
//! through the three-phase curve of [`WarpCurve`]. The host calls
//! [`WarpAnimator::frame`] once per animation frame with the current
//! monotonic time; the curve is sampled against elapsed time, so dropped
//! frames never stretch the effect.
//!
//! Alongside the numeric speed, a cosmetic [`BoostTransform`] (container
//! scale and blur) follows its own eased envelope over the same phase
//! boundaries. The warp settles only when both are done.
//!
//! # Invariants
//!
//! 1. At most one warp is in flight. A request arriving while one runs gets a
//!    ticket settled as [`WarpOutcome::Skipped`] and changes nothing.
//! 2. When a warp ends, for any reason, speed is exactly `1.0`, the boost is
//!    the identity, and the in-flight flag is clear.
//! 3. There is no external cancel. A started warp runs until it completes or
//!    its [`SpeedSink`] fails.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Sink error | Renderer rejected a speed update | Warp aborts, ticket `Failed`, speed reset to 1 |
//! | Overlapping request | Second `warp()` during a warp | Ticket `Skipped`, curve untouched |

use std::fmt;
use std::time::Duration;

use warpgate_core::animation::{Animation, Envelope, Fade, ease_in_out, ease_out_cubic};
use warpgate_core::warp::{RAMP_DOWN, RAMP_UP, WarpCurve, WarpPhase, streaks_visible};

use crate::bus::WarpRequest;
use crate::ticket::{WarpOutcome, WarpSettler, WarpTicket};

/// Container scale at full boost.
pub const BOOST_SCALE: f32 = 1.08;

/// Container blur radius at full boost, in CSS pixels.
pub const BOOST_BLUR_PX: f32 = 2.0;

/// Cosmetic transform applied to the starfield container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostTransform {
    /// Uniform scale factor.
    pub scale: f32,
    /// Blur radius in pixels.
    pub blur_px: f32,
}

impl BoostTransform {
    /// No scale, no blur.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        blur_px: 0.0,
    };

    /// Transform at boost level `level` in [0, 1].
    #[must_use]
    pub fn at(level: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        Self {
            scale: 1.0 + (BOOST_SCALE - 1.0) * level,
            blur_px: BOOST_BLUR_PX * level,
        }
    }
}

impl Default for BoostTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Error reported by a [`SpeedSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speed sink error: {}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// Receives live speed updates (the starfield renderer).
pub trait SpeedSink {
    /// Apply a new speed multiplier.
    fn set_speed(&mut self, speed: f32) -> Result<(), SinkError>;
}

struct ActiveWarp {
    request: WarpRequest,
    curve: WarpCurve,
    boost: Envelope,
    started_at: Option<Duration>,
    last_frame: Duration,
    settler: WarpSettler,
}

/// Drives the speed multiplier through warp curves.
pub struct WarpAnimator {
    speed: f32,
    phase: WarpPhase,
    boost: BoostTransform,
    active: Option<ActiveWarp>,
    sink: Option<Box<dyn SpeedSink>>,
    completed: u64,
    skipped: u64,
    failed: u64,
}

impl Default for WarpAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl WarpAnimator {
    /// Create an idle animator with no sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            speed: 1.0,
            phase: WarpPhase::Idle,
            boost: BoostTransform::IDENTITY,
            active: None,
            sink: None,
            completed: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Attach a sink that receives every speed update.
    #[must_use]
    pub fn with_sink(mut self, sink: impl SpeedSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Start a warp.
    ///
    /// The curve's clock starts on the next [`frame`](Self::frame) call.
    /// Returns a ticket that settles when the warp ends.
    pub fn warp(&mut self, request: WarpRequest) -> WarpTicket {
        if let Some(active) = &self.active {
            self.skipped += 1;
            tracing::trace!(
                running_factor = active.request.factor,
                ignored_factor = request.factor,
                "warp already in flight, ignoring request"
            );
            return WarpTicket::settled(WarpOutcome::Skipped);
        }

        let curve = WarpCurve::new(request.factor, request.duration);
        let boost = Envelope::new(
            Fade::new(RAMP_UP).easing(ease_out_cubic),
            curve.hold(),
            Fade::new(RAMP_DOWN).easing(ease_in_out),
        );
        let (ticket, settler) = WarpTicket::new();
        self.active = Some(ActiveWarp {
            request,
            curve,
            boost,
            started_at: None,
            last_frame: Duration::ZERO,
            settler,
        });
        tracing::debug!(
            factor = curve.factor(),
            duration_ms = request.duration.as_millis() as u64,
            hold_ms = curve.hold().as_millis() as u64,
            "warp started"
        );
        ticket
    }

    /// Advance the running warp to `now`.
    pub fn frame(&mut self, now: Duration) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let started = match active.started_at {
            Some(started) => started,
            None => {
                active.started_at = Some(now);
                active.last_frame = now;
                now
            }
        };
        let dt = now.saturating_sub(active.last_frame);
        active.last_frame = now;
        active.boost.tick(dt);

        let (phase, speed) = active.curve.sample(now.saturating_sub(started));
        let boost_done = active.boost.is_complete();
        let level = active.boost.value();

        self.phase = phase;
        self.speed = speed;
        self.boost = BoostTransform::at(level);

        if let Some(sink) = self.sink.as_mut()
            && let Err(err) = sink.set_speed(speed)
        {
            self.finish(WarpOutcome::Failed(err.to_string()));
            return;
        }

        if phase == WarpPhase::Idle && boost_done {
            self.finish(WarpOutcome::Completed);
        }
    }

    fn finish(&mut self, outcome: WarpOutcome) {
        self.speed = 1.0;
        self.phase = WarpPhase::Idle;
        self.boost = BoostTransform::IDENTITY;
        let Some(active) = self.active.take() else {
            return;
        };

        if let Some(sink) = self.sink.as_mut()
            && let Err(err) = sink.set_speed(1.0)
        {
            tracing::warn!(error = %err, "speed sink rejected baseline reset");
        }

        match &outcome {
            WarpOutcome::Completed => {
                self.completed += 1;
                tracing::debug!(factor = active.request.factor, "warp completed");
            }
            other => {
                self.failed += 1;
                tracing::warn!(outcome = %other, "warp aborted, speed restored");
            }
        }
        active.settler.settle(outcome);
    }

    /// Current speed multiplier (>= 1).
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> WarpPhase {
        self.phase
    }

    /// Current container transform.
    #[must_use]
    pub const fn boost(&self) -> BoostTransform {
        self.boost
    }

    /// Whether a warp is in flight.
    #[must_use]
    pub const fn is_warping(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the streak overlay should be drawn.
    #[must_use]
    pub fn streaks_visible(&self) -> bool {
        streaks_visible(self.speed)
    }

    /// Warps that ran to completion.
    #[must_use]
    pub const fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Requests ignored because a warp was in flight.
    #[must_use]
    pub const fn skipped_count(&self) -> u64 {
        self.skipped
    }

    /// Warps aborted by a sink failure.
    #[must_use]
    pub const fn failed_count(&self) -> u64 {
        self.failed
    }
}

impl fmt::Debug for WarpAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarpAnimator")
            .field("speed", &self.speed)
            .field("phase", &self.phase)
            .field("boost", &self.boost)
            .field("warping", &self.is_warping())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn default_request() -> WarpRequest {
        WarpRequest::new(8.0, ms(1200))
    }

    /// Runs frames every `step` from `start` until `end` inclusive.
    fn run(anim: &mut WarpAnimator, start: u64, end: u64, step: u64) {
        let mut t = start;
        while t <= end {
            anim.frame(ms(t));
            t += step;
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        seen: Rc<RefCell<Vec<f32>>>,
        fail_above: Option<f32>,
    }

    impl SpeedSink for RecordingSink {
        fn set_speed(&mut self, speed: f32) -> Result<(), SinkError> {
            self.seen.borrow_mut().push(speed);
            match self.fail_above {
                Some(limit) if speed > limit => Err(SinkError("gpu lost".into())),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn idle_animator_is_at_baseline() {
        let mut anim = WarpAnimator::new();
        anim.frame(ms(100));
        assert_eq!(anim.speed(), 1.0);
        assert_eq!(anim.phase(), WarpPhase::Idle);
        assert_eq!(anim.boost(), BoostTransform::IDENTITY);
        assert!(!anim.streaks_visible());
    }

    #[test]
    fn clock_starts_on_first_frame() {
        let mut anim = WarpAnimator::new();
        let _ticket = anim.warp(default_request());
        anim.frame(ms(5000));
        assert_eq!(anim.speed(), 1.0);
        assert_eq!(anim.phase(), WarpPhase::RampUp);
        anim.frame(ms(5250));
        assert_eq!(anim.speed(), 8.0);
        assert_eq!(anim.phase(), WarpPhase::Hold);
    }

    #[test]
    fn full_curve_settles_completed() {
        let mut anim = WarpAnimator::new();
        let ticket = anim.warp(default_request());
        run(&mut anim, 0, 1184, 16);
        assert!(!ticket.is_settled());
        assert!(anim.is_warping());
        anim.frame(ms(1200));
        assert_eq!(ticket.outcome(), Some(WarpOutcome::Completed));
        assert_eq!(anim.speed(), 1.0);
        assert_eq!(anim.boost(), BoostTransform::IDENTITY);
        assert!(!anim.is_warping());
        assert_eq!(anim.completed_count(), 1);
    }

    #[test]
    fn boost_peaks_during_hold() {
        let mut anim = WarpAnimator::new();
        let _ticket = anim.warp(default_request());
        anim.frame(ms(0));
        anim.frame(ms(500));
        let boost = anim.boost();
        assert!((boost.scale - BOOST_SCALE).abs() < 1e-5);
        assert!((boost.blur_px - BOOST_BLUR_PX).abs() < 1e-5);
        assert!(anim.streaks_visible());
    }

    #[test]
    fn second_warp_is_ignored() {
        let mut anim = WarpAnimator::new();
        let first = anim.warp(default_request());
        anim.frame(ms(0));
        anim.frame(ms(100));
        let second = anim.warp(WarpRequest::new(50.0, ms(5000)));
        assert_eq!(second.outcome(), Some(WarpOutcome::Skipped));
        assert_eq!(anim.skipped_count(), 1);

        anim.frame(ms(250));
        assert_eq!(anim.speed(), 8.0);
        anim.frame(ms(1200));
        assert_eq!(first.outcome(), Some(WarpOutcome::Completed));
        assert_eq!(anim.speed(), 1.0);
    }

    #[test]
    fn new_warp_allowed_after_completion() {
        let mut anim = WarpAnimator::new();
        let _first = anim.warp(default_request());
        anim.frame(ms(0));
        anim.frame(ms(2000));
        assert!(!anim.is_warping());
        let second = anim.warp(WarpRequest::new(2.0, ms(700)));
        assert!(!second.is_settled());
        anim.frame(ms(3000));
        anim.frame(ms(3250));
        assert_eq!(anim.speed(), 2.0);
    }

    #[test]
    fn sink_failure_restores_baseline() {
        let sink = RecordingSink {
            fail_above: Some(4.0),
            ..RecordingSink::default()
        };
        let seen = Rc::clone(&sink.seen);
        let mut anim = WarpAnimator::new().with_sink(sink);
        let ticket = anim.warp(default_request());
        run(&mut anim, 0, 400, 50);

        assert!(matches!(ticket.outcome(), Some(WarpOutcome::Failed(_))));
        assert_eq!(anim.speed(), 1.0);
        assert_eq!(anim.phase(), WarpPhase::Idle);
        assert!(!anim.is_warping());
        assert_eq!(anim.failed_count(), 1);
        assert_eq!(seen.borrow().last().copied(), Some(1.0));
    }

    #[test]
    fn sink_sees_monotonic_ramps() {
        let sink = RecordingSink::default();
        let seen = Rc::clone(&sink.seen);
        let mut anim = WarpAnimator::new().with_sink(sink);
        let _ticket = anim.warp(default_request());
        run(&mut anim, 0, 1200, 10);

        let speeds = seen.borrow();
        let peak = speeds
            .iter()
            .position(|&s| s == 8.0)
            .expect("curve reaches the factor");
        assert!(speeds[..=peak].windows(2).all(|w| w[0] <= w[1]));
        assert!(speeds[peak..].windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(speeds.first().copied(), Some(1.0));
        assert_eq!(speeds.last().copied(), Some(1.0));
    }

    #[test]
    fn boost_transform_levels() {
        assert_eq!(BoostTransform::at(0.0), BoostTransform::IDENTITY);
        let full = BoostTransform::at(1.0);
        assert!((full.scale - BOOST_SCALE).abs() < f32::EPSILON);
        assert_eq!(BoostTransform::at(7.0), full);
    }
}
