#![forbid(unsafe_code)]

//! warpgate runtime
//!
//! The runtime owns the gate's temporal coordination: the transition state
//! machine, the fallback timer cascade that guarantees forward progress, the
//! scroll/keyboard exit trigger, the warp animator, and the bus that
//! connects the controller to the animator.
//!
//! # Key Components
//!
//! - [`TransitionController`] - Gate state machine and sole writer of [`GateState`]
//! - [`FallbackCascade`] - Hint / soft-fallback / hard-fail-safe timers
//! - [`ExitTrigger`] - Wheel accumulation and exit keys
//! - [`WarpAnimator`] - Three-phase speed curve with at-most-one warp in flight
//! - [`WarpBus`] - Injected publish/subscribe channel for warp requests
//! - [`SessionFlag`] - Single "done" flag over a [`StorageBackend`]
//!
//! # Execution model
//! Everything is single-threaded and host-driven. Callers pass the current
//! monotonic time into every operation; nothing reads a wall clock.

pub mod animator;
pub mod bus;
pub mod cascade;
pub mod config;
pub mod controller;
pub mod session;
pub mod ticket;
pub mod timer;
pub mod trigger;

pub use animator::{BoostTransform, SinkError, SpeedSink, WarpAnimator};
pub use bus::{BusError, BusSubscription, WARP_CHANNEL, WarpBus, WarpPayload, WarpRequest};
pub use cascade::{AutoAdvanceGuard, CascadeTimer, CascadeTimings, FallbackCascade};
pub use config::GateConfig;
pub use controller::{GateEffect, GateState, TransitionCause, TransitionController, TransitionRecord};
pub use session::{MemoryStorage, SessionFlag, StorageBackend, StorageError, StorageResult};
pub use ticket::{WarpOutcome, WarpSettler, WarpTicket};
pub use timer::{TimerId, TimerQueue};
pub use trigger::{EXIT_THRESHOLD, ExitTrigger, ScrollAccumulator};

// State persistence
#[cfg(feature = "state-persistence")]
pub use session::FileStorage;
