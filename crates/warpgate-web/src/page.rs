#![forbid(unsafe_code)]

//! Step-based page driver.
//!
//! [`GatePage`] wires a [`TransitionController`], a [`WarpBus`], and a
//! [`WarpAnimator`] together and runs them without threads or blocking.
//! The host controls the loop:
//!
//! 1. Push input via [`GatePage::push_event`] / [`GatePage::set_scroll_offset`].
//! 2. Advance time via [`GatePage::advance_time`].
//! 3. Call [`GatePage::step`] once per animation frame.
//! 4. Apply [`GatePage::take_effects`] to the document.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use core::time::Duration;
//! use warpgate_core::event::Event;
//! use warpgate_runtime::{GateConfig, MemoryStorage};
//! use warpgate_web::GatePage;
//!
//! let mut page = GatePage::new(GateConfig::default(), Arc::new(MemoryStorage::new()));
//! page.init()?;
//!
//! // requestAnimationFrame
//! page.push_event(Event::wheel(120));
//! page.advance_time(Duration::from_millis(16));
//! let result = page.step()?;
//! for effect in page.take_effects() {
//!     // toggle overflow, chrome, overlay...
//! }
//! ```

use core::time::Duration;
use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use warpgate_core::event::Event;
use warpgate_core::warp::WarpPhase;
use warpgate_runtime::{
    BoostTransform, BusError, BusSubscription, GateConfig, GateEffect, GateState, StorageBackend,
    TransitionController, WarpAnimator, WarpBus,
};

use crate::DeterministicClock;

/// Errors from the page driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// [`GatePage::step`] called before [`GatePage::init`].
    NotInitialized,
    /// [`GatePage::init`] called twice.
    AlreadyInitialized,
    /// The animator could not subscribe to the warp channel.
    Bus(BusError),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("page stepped before init"),
            Self::AlreadyInitialized => f.write_str("page initialized twice"),
            Self::Bus(err) => write!(f, "warp bus: {err}"),
        }
    }
}

impl std::error::Error for PageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bus(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BusError> for PageError {
    fn from(err: BusError) -> Self {
        Self::Bus(err)
    }
}

/// Result of a single [`GatePage::step`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Gate state after the step.
    pub state: GateState,
    /// Starfield speed multiplier for this frame.
    pub speed: f32,
    /// Warp phase for this frame.
    pub phase: WarpPhase,
    /// Cosmetic scale/blur for the starfield layer.
    pub boost: BoostTransform,
    /// Whether the streak overlay is shown.
    pub streaks_visible: bool,
    /// Number of events processed during this step.
    pub events_processed: u32,
    /// Current frame index (monotonically increasing).
    pub frame_idx: u64,
}

/// Host-driven gate page.
///
/// # Lifecycle
///
/// 1. [`GatePage::new`] reads the session flag.
/// 2. [`GatePage::init`] subscribes the animator and mounts the gate.
/// 3. [`GatePage::step`] from the host frame loop.
/// 4. [`GatePage::unmount`] on teardown.
pub struct GatePage {
    clock: DeterministicClock,
    queue: VecDeque<Event>,
    scroll_offset: f64,
    bus: WarpBus,
    animator: Rc<RefCell<WarpAnimator>>,
    controller: TransitionController,
    subscription: Option<BusSubscription>,
    effects: Vec<GateEffect>,
    initialized: bool,
    frame_idx: u64,
}

impl GatePage {
    /// Create a page with a fresh bus and animator.
    #[must_use]
    pub fn new(config: GateConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let bus = WarpBus::new();
        let controller = TransitionController::new(config, storage, bus.clone());
        Self {
            clock: DeterministicClock::new(),
            queue: VecDeque::new(),
            scroll_offset: 0.0,
            bus,
            animator: Rc::new(RefCell::new(WarpAnimator::new())),
            controller,
            subscription: None,
            effects: Vec::new(),
            initialized: false,
            frame_idx: 0,
        }
    }

    /// Replace the animator, e.g. to attach a speed sink.
    ///
    /// Must be called before [`init`](Self::init).
    #[must_use]
    pub fn with_animator(mut self, animator: WarpAnimator) -> Self {
        self.animator = Rc::new(RefCell::new(animator));
        self
    }

    /// Subscribe the animator to the warp channel and mount the gate.
    pub fn init(&mut self) -> Result<(), PageError> {
        if self.initialized {
            return Err(PageError::AlreadyInitialized);
        }
        let animator = Rc::clone(&self.animator);
        let subscription = self
            .bus
            .subscribe(move |request| animator.borrow_mut().warp(request))?;
        self.subscription = Some(subscription);
        self.initialized = true;

        let now = self.clock.now();
        self.controller.mount(now);
        self.effects.extend(self.controller.drain_effects());
        tracing::debug!(state = %self.controller.state(), "gate page initialized");
        Ok(())
    }

    /// Process queued input, advance the warp, fire due timers.
    pub fn step(&mut self) -> Result<StepResult, PageError> {
        if !self.initialized {
            return Err(PageError::NotInitialized);
        }
        let now = self.clock.now();

        let mut events_processed: u32 = 0;
        while let Some(event) = self.queue.pop_front() {
            events_processed += 1;
            self.controller.handle_event(&event, now);
        }

        self.animator.borrow_mut().frame(now);
        self.controller.tick(now);
        self.effects.extend(self.controller.drain_effects());
        self.frame_idx += 1;

        let animator = self.animator.borrow();
        Ok(StepResult {
            state: self.controller.state(),
            speed: animator.speed(),
            phase: animator.phase(),
            boost: animator.boost(),
            streaks_visible: animator.streaks_visible(),
            events_processed,
            frame_idx: self.frame_idx,
        })
    }

    /// Queue an input event for the next [`step`](Self::step).
    pub fn push_event(&mut self, event: Event) {
        if let Event::Scroll { offset_y } = event {
            self.scroll_offset = offset_y;
        }
        self.queue.push_back(event);
    }

    /// Report the page's vertical scroll position (`window.scrollY`).
    ///
    /// Browsers fire `scroll` repeatedly at the same position; only a changed
    /// offset is queued. A page revealed at the top therefore does not
    /// re-enter until it has scrolled away and come back. Returns whether an
    /// event was queued.
    pub fn set_scroll_offset(&mut self, offset_y: f64) -> bool {
        if offset_y == self.scroll_offset {
            return false;
        }
        self.push_event(Event::scroll(offset_y));
        true
    }

    /// Advance the deterministic clock by `dt`.
    pub fn advance_time(&mut self, dt: Duration) {
        self.clock.advance(dt);
    }

    /// Set the deterministic clock to an absolute time.
    pub fn set_time(&mut self, now: Duration) {
        self.clock.set(now);
    }

    /// Tear down: cancel timers and drop the bus subscription.
    pub fn unmount(&mut self) {
        self.controller.unmount();
        self.effects.extend(self.controller.drain_effects());
        self.subscription = None;
    }

    /// Take effects emitted since the last call.
    pub fn take_effects(&mut self) -> Vec<GateEffect> {
        std::mem::take(&mut self.effects)
    }

    /// The gate controller.
    #[must_use]
    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }

    /// The starfield animator.
    #[must_use]
    pub fn animator(&self) -> Ref<'_, WarpAnimator> {
        self.animator.borrow()
    }

    /// Warp channel, for other publishers on the page.
    #[must_use]
    pub fn bus(&self) -> &WarpBus {
        &self.bus
    }

    /// Last reported scroll offset; [`set_scroll_offset`](Self::set_scroll_offset)
    /// compares against it.
    #[must_use]
    pub const fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Current clock time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Whether [`init`](Self::init) has run.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current frame index.
    #[must_use]
    pub const fn frame_idx(&self) -> u64 {
        self.frame_idx
    }
}

impl fmt::Debug for GatePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePage")
            .field("now", &self.clock.now())
            .field("state", &self.controller.state())
            .field("queued", &self.queue.len())
            .field("scroll_offset", &self.scroll_offset)
            .field("frame_idx", &self.frame_idx)
            .finish_non_exhaustive()
    }
}
