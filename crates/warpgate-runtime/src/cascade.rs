#![forbid(unsafe_code)]

//! Fallback timer cascade and the auto-advance guard.
//!
//! The gate advances from `AwaitingInteraction` to `Geometrical` when the
//! user interacts. If the renderer never reports an interaction, three staged
//! timers take over:
//!
//! | Timer | Default | Effect |
//! |-------|---------|--------|
//! | Hint | 1200 ms | Shows the "click or press a key" hint. Cosmetic. |
//! | Soft fallback | 2200 ms | Guarded advance. |
//! | Hard fail-safe | 3500 ms | Guarded advance. Survives a cancelled soft timer. |
//!
//! Every racing source (renderer callback, keyboard, both fallbacks) must
//! claim the [`AutoAdvanceGuard`] before acting. Claiming checks and sets in
//! one call, so on a single thread exactly one source wins.
//!
//! # Invariants
//!
//! 1. [`FallbackCascade::arm_all`] cancels any previously armed handles first.
//! 2. After [`FallbackCascade::cancel_all`] no cascade timer is ever returned
//!    by [`FallbackCascade::poll`].
//! 3. The hint timer never claims the guard.

use std::time::Duration;

use crate::timer::{TimerId, TimerQueue};

/// One-shot latch on the advance edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoAdvanceGuard {
    claimed: bool,
}

impl AutoAdvanceGuard {
    /// Create an unclaimed guard.
    #[must_use]
    pub const fn new() -> Self {
        Self { claimed: false }
    }

    /// Claim the guard. Returns `true` only for the first caller.
    pub fn try_claim(&mut self) -> bool {
        if self.claimed {
            return false;
        }
        self.claimed = true;
        true
    }

    /// Whether some source already advanced the gate.
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Reopen the guard for a new interaction episode.
    pub fn release(&mut self) {
        self.claimed = false;
    }
}

/// Which cascade timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeTimer {
    /// Cosmetic hint affordance.
    Hint,
    /// First guarded fallback.
    SoftFallback,
    /// Last-resort guarded fallback.
    HardFailSafe,
}

impl CascadeTimer {
    /// Whether this timer performs the guarded advance.
    #[must_use]
    pub const fn advances(self) -> bool {
        !matches!(self, Self::Hint)
    }

    const fn slot(self) -> usize {
        match self {
            Self::Hint => 0,
            Self::SoftFallback => 1,
            Self::HardFailSafe => 2,
        }
    }
}

/// Delays for the three cascade timers, measured from arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeTimings {
    /// Delay before the hint is shown.
    pub hint: Duration,
    /// Delay before the soft fallback advances.
    pub soft_fallback: Duration,
    /// Delay before the hard fail-safe advances.
    pub hard_fail_safe: Duration,
}

impl Default for CascadeTimings {
    fn default() -> Self {
        Self {
            hint: Duration::from_millis(1200),
            soft_fallback: Duration::from_millis(2200),
            hard_fail_safe: Duration::from_millis(3500),
        }
    }
}

impl CascadeTimings {
    /// Set the hint delay.
    #[must_use]
    pub fn with_hint(mut self, delay: Duration) -> Self {
        self.hint = delay;
        self
    }

    /// Set the soft fallback delay.
    #[must_use]
    pub fn with_soft_fallback(mut self, delay: Duration) -> Self {
        self.soft_fallback = delay;
        self
    }

    /// Set the hard fail-safe delay.
    #[must_use]
    pub fn with_hard_fail_safe(mut self, delay: Duration) -> Self {
        self.hard_fail_safe = delay;
        self
    }

    fn delay(&self, timer: CascadeTimer) -> Duration {
        match timer {
            CascadeTimer::Hint => self.hint,
            CascadeTimer::SoftFallback => self.soft_fallback,
            CascadeTimer::HardFailSafe => self.hard_fail_safe,
        }
    }
}

/// Three cancellable timer handles armed and cancelled as a unit.
#[derive(Debug)]
pub struct FallbackCascade {
    timings: CascadeTimings,
    queue: TimerQueue<CascadeTimer>,
    handles: [Option<TimerId>; 3],
    armed_count: u64,
}

impl FallbackCascade {
    const ALL: [CascadeTimer; 3] = [
        CascadeTimer::Hint,
        CascadeTimer::SoftFallback,
        CascadeTimer::HardFailSafe,
    ];

    /// Create a disarmed cascade.
    #[must_use]
    pub fn new(timings: CascadeTimings) -> Self {
        Self {
            timings,
            queue: TimerQueue::new(),
            handles: [None; 3],
            armed_count: 0,
        }
    }

    /// Configured delays.
    #[must_use]
    pub const fn timings(&self) -> &CascadeTimings {
        &self.timings
    }

    /// Arm all three timers relative to `now`, replacing any armed ones.
    pub fn arm_all(&mut self, now: Duration) {
        self.cancel_all();
        for timer in Self::ALL {
            let id = self
                .queue
                .schedule_after(now, self.timings.delay(timer), timer);
            self.handles[timer.slot()] = Some(id);
        }
        self.armed_count += 1;
        tracing::trace!(
            now_ms = now.as_millis() as u64,
            hint_ms = self.timings.hint.as_millis() as u64,
            soft_ms = self.timings.soft_fallback.as_millis() as u64,
            hard_ms = self.timings.hard_fail_safe.as_millis() as u64,
            "fallback cascade armed"
        );
    }

    /// Cancel every armed timer.
    pub fn cancel_all(&mut self) {
        let mut cancelled = 0usize;
        for handle in &mut self.handles {
            if let Some(id) = handle.take()
                && self.queue.cancel(id)
            {
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::trace!(cancelled, "fallback cascade cancelled");
        }
    }

    /// Return the next timer due at `now`, if any.
    ///
    /// Call repeatedly until `None`; state changes made between calls (such
    /// as [`cancel_all`](Self::cancel_all)) are honored.
    pub fn poll(&mut self, now: Duration) -> Option<CascadeTimer> {
        let (id, timer) = self.queue.pop_due(now)?;
        let slot = &mut self.handles[timer.slot()];
        if *slot == Some(id) {
            *slot = None;
        }
        Some(timer)
    }

    /// Whether `timer` is currently armed.
    #[must_use]
    pub fn is_armed(&self, timer: CascadeTimer) -> bool {
        self.handles[timer.slot()].is_some_and(|id| self.queue.is_armed(id))
    }

    /// Whether any timer is armed.
    #[must_use]
    pub fn any_armed(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Earliest pending deadline, for hosts that sleep between frames.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.next_deadline()
    }

    /// How many times the cascade has been armed.
    #[must_use]
    pub const fn armed_count(&self) -> u64 {
        self.armed_count
    }
}
