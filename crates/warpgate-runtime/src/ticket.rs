#![forbid(unsafe_code)]

//! Settle handles for warp requests.
//!
//! A [`WarpTicket`] is the single-threaded analogue of a promise: the
//! publisher keeps the ticket and polls it, the animator keeps the paired
//! [`WarpSettler`] and settles it exactly once when the warp finishes.
//!
//! # Invariants
//!
//! 1. A ticket settles at most once; later `settle` calls are ignored.
//! 2. Dropping an unsettled [`WarpSettler`] settles the ticket as
//!    [`WarpOutcome::Failed`], so a publisher can never wait forever.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// How a warp request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarpOutcome {
    /// The curve ran to the end.
    Completed,
    /// Another warp was already in flight; this request had no effect.
    Skipped,
    /// No subscriber was listening on the bus.
    Dropped,
    /// The warp aborted; speed was restored to baseline.
    Failed(String),
}

impl WarpOutcome {
    /// Whether the warp actually played to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for WarpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Skipped => f.write_str("skipped"),
            Self::Dropped => f.write_str("dropped"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

type Slot = Rc<RefCell<Option<WarpOutcome>>>;

/// Publisher-side handle; poll with [`outcome`](Self::outcome).
#[derive(Clone)]
pub struct WarpTicket {
    slot: Slot,
}

impl WarpTicket {
    /// Create an unsettled ticket and its settler.
    #[must_use]
    pub fn new() -> (Self, WarpSettler) {
        let slot: Slot = Rc::new(RefCell::new(None));
        let settler = WarpSettler {
            slot: Some(Rc::clone(&slot)),
        };
        (Self { slot }, settler)
    }

    /// Create a ticket that is already settled.
    #[must_use]
    pub fn settled(outcome: WarpOutcome) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(outcome))),
        }
    }

    /// The outcome, once settled.
    #[must_use]
    pub fn outcome(&self) -> Option<WarpOutcome> {
        self.slot.borrow().clone()
    }

    /// Whether the ticket has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl fmt::Debug for WarpTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarpTicket")
            .field("outcome", &*self.slot.borrow())
            .finish()
    }
}

/// Animator-side handle that settles a [`WarpTicket`].
pub struct WarpSettler {
    slot: Option<Slot>,
}

impl WarpSettler {
    /// Settle the ticket. Ignored if it already settled.
    pub fn settle(mut self, outcome: WarpOutcome) {
        if let Some(slot) = self.slot.take() {
            let mut guard = slot.borrow_mut();
            if guard.is_none() {
                *guard = Some(outcome);
            }
        }
    }
}

impl Drop for WarpSettler {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let mut guard = slot.borrow_mut();
            if guard.is_none() {
                *guard = Some(WarpOutcome::Failed("warp abandoned".into()));
            }
        }
    }
}

impl fmt::Debug for WarpSettler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarpSettler")
            .field("armed", &self.slot.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ticket_is_pending() {
        let (ticket, _settler) = WarpTicket::new();
        assert!(!ticket.is_settled());
        assert_eq!(ticket.outcome(), None);
    }

    #[test]
    fn settle_is_visible_through_clones() {
        let (ticket, settler) = WarpTicket::new();
        let other = ticket.clone();
        settler.settle(WarpOutcome::Completed);
        assert_eq!(ticket.outcome(), Some(WarpOutcome::Completed));
        assert_eq!(other.outcome(), Some(WarpOutcome::Completed));
    }

    #[test]
    fn dropped_settler_fails_ticket() {
        let (ticket, settler) = WarpTicket::new();
        drop(settler);
        assert!(matches!(ticket.outcome(), Some(WarpOutcome::Failed(_))));
    }

    #[test]
    fn presettled_ticket() {
        let ticket = WarpTicket::settled(WarpOutcome::Skipped);
        assert!(ticket.is_settled());
        assert!(!ticket.outcome().is_some_and(|o| o.is_completed()));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(WarpOutcome::Completed.to_string(), "completed");
        assert_eq!(WarpOutcome::Failed("boom".into()).to_string(), "failed: boom");
    }
}
