#![forbid(unsafe_code)]

//! Cancellable one-shot timers on a caller-supplied clock.
//!
//! [`TimerQueue`] is the coarse scheduling primitive of the runtime. Timers
//! are armed against an absolute monotonic deadline and handed back by
//! [`TimerQueue::pop_due`] one at a time, earliest deadline first, ties in
//! registration order. Popping one at a time lets a callback cancel its
//! siblings before they are considered.

use std::time::Duration;

/// Handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Armed<T> {
    id: TimerId,
    deadline: Duration,
    payload: T,
}

/// A queue of one-shot timers.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    armed: Vec<Armed<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            armed: Vec::new(),
        }
    }

    /// Arm a timer firing at `deadline`.
    pub fn schedule(&mut self, deadline: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.armed.push(Armed {
            id,
            deadline,
            payload,
        });
        id
    }

    /// Arm a timer firing `delay` after `now`.
    pub fn schedule_after(&mut self, now: Duration, delay: Duration, payload: T) -> TimerId {
        self.schedule(now.saturating_add(delay), payload)
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.armed.len();
        self.armed.retain(|t| t.id != id);
        self.armed.len() != before
    }

    /// Whether `id` is still armed.
    #[must_use]
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.iter().any(|t| t.id == id)
    }

    /// Remove and return the earliest timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let idx = self
            .armed
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.id))
            .map(|(idx, _)| idx)?;
        let fired = self.armed.swap_remove(idx);
        Some((fired.id, fired.payload))
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.armed.iter().map(|t| t.deadline).min()
    }

    /// Number of armed timers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    /// Whether no timers are armed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Cancel every armed timer.
    pub fn clear(&mut self) {
        self.armed.clear();
    }
}
