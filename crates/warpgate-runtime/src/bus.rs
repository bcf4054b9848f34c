#![forbid(unsafe_code)]

//! Page-wide warp request channel.
//!
//! [`WarpBus`] carries one message type, a warp request, from any number of
//! publishers to at most one subscriber. It replaces a window-global custom
//! event (`starfield:warp`) with an explicit handle that is injected into the
//! controller and the animator, so both can be exercised without a DOM.
//!
//! # Delivery
//!
//! - Delivery is synchronous: `publish` calls the subscriber before returning.
//! - There is no buffering. Publishing with no subscriber yields a ticket
//!   settled as [`WarpOutcome::Dropped`].
//! - A publish issued from inside the subscriber's own handler is dropped
//!   rather than re-entering it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::ticket::{WarpOutcome, WarpTicket};

/// Name of the channel, kept for hosts bridging DOM custom events.
pub const WARP_CHANNEL: &str = "starfield:warp";

/// A fully resolved warp request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpRequest {
    /// Peak speed multiplier (> 1).
    pub factor: f32,
    /// Total duration of the effect.
    pub duration: Duration,
}

impl Default for WarpRequest {
    fn default() -> Self {
        Self {
            factor: 8.0,
            duration: Duration::from_millis(1200),
        }
    }
}

impl WarpRequest {
    /// Create a request.
    #[must_use]
    pub const fn new(factor: f32, duration: Duration) -> Self {
        Self { factor, duration }
    }
}

/// Wire payload of a bus message; missing fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WarpPayload {
    /// Optional speed multiplier.
    pub factor: Option<f32>,
    /// Optional total duration in milliseconds.
    pub duration_ms: Option<u64>,
}

impl WarpPayload {
    /// Fill missing fields from `defaults`.
    #[must_use]
    pub fn resolve(self, defaults: WarpRequest) -> WarpRequest {
        WarpRequest {
            factor: self.factor.unwrap_or(defaults.factor),
            duration: self
                .duration_ms
                .map_or(defaults.duration, Duration::from_millis),
        }
    }
}

impl From<WarpRequest> for WarpPayload {
    fn from(request: WarpRequest) -> Self {
        Self {
            factor: Some(request.factor),
            duration_ms: Some(request.duration.as_millis() as u64),
        }
    }
}

/// Errors from bus operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// A subscriber is already registered.
    AlreadySubscribed,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySubscribed => {
                write!(f, "channel {WARP_CHANNEL} already has a subscriber")
            }
        }
    }
}

impl std::error::Error for BusError {}

type Handler = Box<dyn FnMut(WarpRequest) -> WarpTicket>;

struct Subscriber {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    subscriber: RefCell<Option<Subscriber>>,
    next_id: Cell<u64>,
    delivered: Cell<u64>,
    dropped: Cell<u64>,
}

/// Cloneable handle to the warp channel.
#[derive(Clone, Default)]
pub struct WarpBus {
    inner: Rc<BusInner>,
}

impl WarpBus {
    /// Create a channel with no subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the subscriber.
    ///
    /// The handler receives resolved requests and returns the ticket the
    /// publisher will poll. Dropping the returned [`BusSubscription`]
    /// unregisters it.
    pub fn subscribe(
        &self,
        handler: impl FnMut(WarpRequest) -> WarpTicket + 'static,
    ) -> Result<BusSubscription, BusError> {
        let mut slot = self.inner.subscriber.borrow_mut();
        if slot.is_some() {
            return Err(BusError::AlreadySubscribed);
        }
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        *slot = Some(Subscriber {
            id,
            handler: Box::new(handler),
        });
        tracing::debug!(channel = WARP_CHANNEL, sub_id = id, "warp subscriber registered");
        Ok(BusSubscription {
            bus: Rc::downgrade(&self.inner),
            id,
        })
    }

    /// Publish a warp request, resolving missing fields against the defaults.
    pub fn publish(&self, payload: impl Into<WarpPayload>) -> WarpTicket {
        let request = payload.into().resolve(WarpRequest::default());
        let Ok(mut slot) = self.inner.subscriber.try_borrow_mut() else {
            tracing::warn!(
                channel = WARP_CHANNEL,
                "warp published from inside the subscriber, dropping"
            );
            self.inner.dropped.set(self.inner.dropped.get() + 1);
            return WarpTicket::settled(WarpOutcome::Dropped);
        };
        match slot.as_mut() {
            Some(sub) => {
                self.inner.delivered.set(self.inner.delivered.get() + 1);
                tracing::debug!(
                    channel = WARP_CHANNEL,
                    factor = request.factor,
                    duration_ms = request.duration.as_millis() as u64,
                    "warp published"
                );
                (sub.handler)(request)
            }
            None => {
                self.inner.dropped.set(self.inner.dropped.get() + 1);
                tracing::debug!(channel = WARP_CHANNEL, "warp published with no subscriber");
                WarpTicket::settled(WarpOutcome::Dropped)
            }
        }
    }

    /// Whether a subscriber is registered.
    #[must_use]
    pub fn has_subscriber(&self) -> bool {
        self.inner
            .subscriber
            .try_borrow()
            .map_or(true, |slot| slot.is_some())
    }

    /// Messages handed to a subscriber so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.get()
    }

    /// Messages lost for lack of a subscriber.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.get()
    }
}

impl fmt::Debug for WarpBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarpBus")
            .field("subscribed", &self.has_subscriber())
            .field("delivered", &self.delivered())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Registration guard; dropping it unsubscribes.
#[derive(Debug)]
pub struct BusSubscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let Ok(mut slot) = inner.subscriber.try_borrow_mut() else {
            return;
        };
        if slot.as_ref().is_some_and(|s| s.id == self.id) {
            *slot = None;
            tracing::debug!(channel = WARP_CHANNEL, sub_id = self.id, "warp subscriber removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_bus() -> (WarpBus, Rc<RefCell<Vec<WarpRequest>>>, BusSubscription) {
        let bus = WarpBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = bus
            .subscribe(move |req| {
                sink.borrow_mut().push(req);
                WarpTicket::settled(WarpOutcome::Completed)
            })
            .expect("first subscriber");
        (bus, seen, sub)
    }

    #[test]
    fn payload_defaults() {
        let req = WarpPayload::default().resolve(WarpRequest::default());
        assert_eq!(req, WarpRequest::new(8.0, Duration::from_millis(1200)));

        let partial = WarpPayload {
            factor: Some(3.0),
            duration_ms: None,
        };
        assert_eq!(
            partial.resolve(WarpRequest::default()),
            WarpRequest::new(3.0, Duration::from_millis(1200))
        );
    }

    #[test]
    fn publish_reaches_subscriber() {
        let (bus, seen, _sub) = recording_bus();
        let ticket = bus.publish(WarpRequest::new(4.0, Duration::from_millis(900)));
        assert_eq!(ticket.outcome(), Some(WarpOutcome::Completed));
        assert_eq!(
            seen.borrow().as_slice(),
            &[WarpRequest::new(4.0, Duration::from_millis(900))]
        );
        assert_eq!(bus.delivered(), 1);
    }

    #[test]
    fn publish_without_subscriber_is_lost() {
        let bus = WarpBus::new();
        let ticket = bus.publish(WarpPayload::default());
        assert_eq!(ticket.outcome(), Some(WarpOutcome::Dropped));
        assert_eq!(bus.dropped(), 1);
    }

    #[test]
    fn second_subscriber_rejected() {
        let (bus, _seen, _sub) = recording_bus();
        let err = bus
            .subscribe(|_| WarpTicket::settled(WarpOutcome::Completed))
            .unwrap_err();
        assert_eq!(err, BusError::AlreadySubscribed);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let (bus, seen, sub) = recording_bus();
        drop(sub);
        assert!(!bus.has_subscriber());
        let ticket = bus.publish(WarpPayload::default());
        assert_eq!(ticket.outcome(), Some(WarpOutcome::Dropped));
        assert!(seen.borrow().is_empty());
        assert!(bus.subscribe(|_| WarpTicket::settled(WarpOutcome::Completed)).is_ok());
    }

    #[test]
    fn cloned_publishers_share_channel() {
        let (bus, seen, _sub) = recording_bus();
        let other = bus.clone();
        bus.publish(WarpPayload::default());
        other.publish(WarpPayload::default());
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn reentrant_publish_is_dropped() {
        let bus = WarpBus::new();
        let inner_bus = bus.clone();
        let inner_outcome = Rc::new(RefCell::new(None));
        let record = Rc::clone(&inner_outcome);
        let _sub = bus
            .subscribe(move |_| {
                let nested = inner_bus.publish(WarpPayload::default());
                *record.borrow_mut() = nested.outcome();
                WarpTicket::settled(WarpOutcome::Completed)
            })
            .expect("subscribe");
        let outer = bus.publish(WarpPayload::default());
        assert_eq!(outer.outcome(), Some(WarpOutcome::Completed));
        assert_eq!(*inner_outcome.borrow(), Some(WarpOutcome::Dropped));
    }
}
