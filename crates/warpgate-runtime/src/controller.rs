#![forbid(unsafe_code)]

//! Gate transition controller.
//!
//! [`TransitionController`] owns the gate's state machine and is its only
//! writer. It composes the fallback cascade, the exit trigger, the session
//! flag, and the warp bus:
//!
//! ```text
//!   Intro ──mount──▶ AwaitingInteraction ──advance──▶ Geometrical ──exit──▶ Transitioning
//!                          ▲                              │  ▲                    │
//!                          └──────── request_return ──────┘  │              warp settles
//!                                                            │                    ▼
//!                                                            └──── scrollY == 0 ── Revealed
//! ```
//!
//! "advance" is claimed by exactly one of: renderer interaction, keyboard
//! (`Enter`/`Space`/`Escape`), soft fallback, hard fail-safe.
//!
//! # Observable effects
//!
//! Each transition emits [`GateEffect`]s, on change only, for the host to
//! apply: page scroll lock (only `Intro`/`AwaitingInteraction`), chrome
//! (only `Geometrical`), gate mounted (everything but `Revealed`), the warp
//! request on the exit edge, and `Completed` when content is revealed.
//!
//! # Invariants
//!
//! 1. The only backward edges are `Revealed → Geometrical` (scroll offset
//!    exactly zero) and `Geometrical → AwaitingInteraction` (explicit return).
//! 2. Cascade timers are cancelled on leaving `AwaitingInteraction` and on
//!    [`unmount`](TransitionController::unmount); none acts afterwards.
//! 3. The reveal is never blocked by the warp: any settled outcome reveals.
//! 4. The session flag is read once, in [`new`](TransitionController::new),
//!    and written at most once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use warpgate_core::event::{Event, KeyCode, KeyEvent};

use crate::bus::{WarpBus, WarpRequest};
use crate::cascade::{AutoAdvanceGuard, CascadeTimer, FallbackCascade};
use crate::config::GateConfig;
use crate::session::{SessionFlag, StorageBackend};
use crate::ticket::{WarpOutcome, WarpTicket};
use crate::trigger::ExitTrigger;

/// Authoritative gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateState {
    /// Constructed, not yet mounted.
    Intro,
    /// Visible, waiting for the user or a fallback.
    AwaitingInteraction,
    /// Interaction confirmed; secondary content shown; listening for exit.
    Geometrical,
    /// Exit warp in flight.
    Transitioning,
    /// Gate unmounted; main content usable.
    Revealed,
}

impl GateState {
    /// Whether the page must not scroll in this state.
    #[must_use]
    pub const fn locks_scroll(self) -> bool {
        matches!(self, Self::Intro | Self::AwaitingInteraction)
    }

    /// Whether navigation chrome and the scroll hint are shown.
    #[must_use]
    pub const fn shows_chrome(self) -> bool {
        matches!(self, Self::Geometrical)
    }

    /// Whether the gate overlay is rendered.
    #[must_use]
    pub const fn renders_gate(self) -> bool {
        !matches!(self, Self::Revealed)
    }

    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::AwaitingInteraction => "awaiting_interaction",
            Self::Geometrical => "geometrical",
            Self::Transitioning => "transitioning",
            Self::Revealed => "revealed",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionCause {
    /// The gate mounted.
    Mount,
    /// Renderer callback or manual control.
    Interaction,
    /// `Enter`, `Space`, or `Escape` while awaiting interaction.
    Keyboard,
    /// Soft fallback timer.
    SoftFallback,
    /// Hard fail-safe timer.
    HardFailSafe,
    /// Explicit return to the intro scene.
    Return,
    /// Wheel accumulator reached the threshold.
    Wheel,
    /// `ArrowDown`, `PageDown`, or `Space` while geometrical.
    ExitKey,
    /// Programmatic exit request.
    Exit,
    /// The warp settled.
    Reveal,
    /// Page scrolled back to the top.
    Reentry,
}

/// One entry in the transition history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Clock time of the transition.
    pub at: Duration,
    /// Previous state.
    pub from: GateState,
    /// New state.
    pub to: GateState,
    /// Trigger.
    pub cause: TransitionCause,
}

/// Side effect for the host to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateEffect {
    /// Lock or unlock page scrolling.
    ScrollLock(bool),
    /// Show or hide navigation chrome and the scroll hint.
    ChromeVisible(bool),
    /// Show or hide the "click or press a key" hint.
    HintVisible(bool),
    /// Mount or unmount the gate overlay.
    GateMounted(bool),
    /// A warp was published on the bus.
    WarpRequested(WarpRequest),
    /// Main content has been revealed.
    Completed,
}

/// The gate state machine.
pub struct TransitionController {
    config: GateConfig,
    state: GateState,
    guard: AutoAdvanceGuard,
    cascade: FallbackCascade,
    trigger: ExitTrigger,
    session: Option<SessionFlag>,
    bus: WarpBus,
    pending_warp: Option<WarpTicket>,
    last_outcome: Option<WarpOutcome>,
    hint_visible: bool,
    alive: bool,
    exit_requests: u64,
    effects: Vec<GateEffect>,
    history: Vec<TransitionRecord>,
    on_complete: Option<Box<dyn FnMut()>>,
}

impl TransitionController {
    /// Create a controller, reading the session flag once.
    ///
    /// Starts in `Revealed` when `config.remember` is set and the flag is
    /// present; otherwise in `Intro`.
    #[must_use]
    pub fn new(config: GateConfig, storage: Arc<dyn StorageBackend>, bus: WarpBus) -> Self {
        let session = config
            .remember
            .then(|| SessionFlag::new(storage, config.storage_key.clone()));
        let seen = session.as_ref().is_some_and(SessionFlag::is_done);
        let state = if seen {
            GateState::Revealed
        } else {
            GateState::Intro
        };
        tracing::info!(
            remember = config.remember,
            key = %config.storage_key,
            initial = %state,
            "gate controller created"
        );
        Self {
            cascade: FallbackCascade::new(config.timings),
            trigger: ExitTrigger::new(config.exit_threshold),
            config,
            state,
            guard: AutoAdvanceGuard::new(),
            session,
            bus,
            pending_warp: None,
            last_outcome: None,
            hint_visible: false,
            alive: true,
            exit_requests: 0,
            effects: Vec::new(),
            history: Vec::new(),
            on_complete: None,
        }
    }

    /// Run `hook` every time the gate reveals content.
    #[must_use]
    pub fn with_on_complete(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Mount the gate at `now`.
    ///
    /// From `Intro` this locks scrolling, renders the overlay, enters
    /// `AwaitingInteraction`, and arms the fallback cascade. Remounting while
    /// still awaiting interaction re-arms the cascade from `now` if
    /// [`unmount`](Self::unmount) cancelled it. A controller that starts
    /// `Revealed` renders nothing.
    pub fn mount(&mut self, now: Duration) {
        self.alive = true;
        match self.state {
            GateState::Intro => {
                self.effects.push(GateEffect::GateMounted(true));
                self.effects.push(GateEffect::ScrollLock(true));
                self.set_state(GateState::AwaitingInteraction, TransitionCause::Mount, now);
                self.cascade.arm_all(now);
            }
            GateState::AwaitingInteraction
                if !self.guard.is_claimed() && !self.cascade.any_armed() =>
            {
                self.cascade.arm_all(now);
                tracing::debug!(at_ms = now.as_millis() as u64, "fallback cascade re-armed on remount");
            }
            _ => {}
        }
    }

    /// Tear down: cancel every timer; nothing acts until the next mount.
    pub fn unmount(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.cascade.cancel_all();
        if self.hint_visible {
            self.hint_visible = false;
            self.effects.push(GateEffect::HintVisible(false));
        }
        tracing::debug!(state = %self.state, "gate controller unmounted");
    }

    // ── Operations ─────────────────────────────────────────────────────

    /// Guarded `AwaitingInteraction → Geometrical`.
    pub fn confirm_interaction(&mut self, now: Duration) -> bool {
        self.advance(now, TransitionCause::Interaction)
    }

    /// `Geometrical → AwaitingInteraction`, starting a new interaction
    /// episode: the guard is released and the cascade re-armed.
    pub fn request_return(&mut self, now: Duration) -> bool {
        if !self.alive || self.state != GateState::Geometrical {
            return false;
        }
        self.guard.release();
        self.set_state(
            GateState::AwaitingInteraction,
            TransitionCause::Return,
            now,
        );
        self.cascade.arm_all(now);
        true
    }

    /// Renderer callback / manual control: confirm while awaiting, return
    /// while geometrical, otherwise nothing.
    pub fn handle_interaction(&mut self, now: Duration) -> bool {
        match self.state {
            GateState::AwaitingInteraction => self.confirm_interaction(now),
            GateState::Geometrical => self.request_return(now),
            _ => false,
        }
    }

    /// Leave `Geometrical` and publish the exit warp.
    pub fn request_exit(&mut self, now: Duration) -> bool {
        self.exit(now, TransitionCause::Exit)
    }

    /// Fire due cascade timers and settle a finished warp.
    pub fn tick(&mut self, now: Duration) {
        if !self.alive {
            return;
        }
        while let Some(timer) = self.cascade.poll(now) {
            self.on_timer(timer, now);
        }
        self.poll_warp(now);
    }

    /// Route one input event.
    pub fn handle_event(&mut self, event: &Event, now: Duration) {
        if !self.alive {
            return;
        }
        match event {
            Event::Key(key) if key.is_down() => self.on_key(*key, now),
            Event::Wheel(wheel) => {
                if self.state == GateState::Geometrical && self.trigger.on_wheel(*wheel) {
                    self.exit(now, TransitionCause::Wheel);
                }
            }
            Event::Scroll { offset_y } => {
                self.on_scroll(*offset_y, now);
            }
            Event::Interaction => {
                self.handle_interaction(now);
            }
            Event::Tick => self.tick(now),
            Event::Key(_) => {}
        }
    }

    /// Drain effects emitted since the last call.
    pub fn drain_effects(&mut self) -> Vec<GateEffect> {
        std::mem::take(&mut self.effects)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn advance(&mut self, now: Duration, cause: TransitionCause) -> bool {
        if !self.alive || self.state != GateState::AwaitingInteraction {
            return false;
        }
        if !self.guard.try_claim() {
            tracing::trace!(?cause, "advance already claimed");
            return false;
        }
        self.set_state(GateState::Geometrical, cause, now);
        true
    }

    fn exit(&mut self, now: Duration, cause: TransitionCause) -> bool {
        if !self.alive || self.state != GateState::Geometrical {
            return false;
        }
        self.set_state(GateState::Transitioning, cause, now);
        self.exit_requests += 1;
        let request = self.config.exit_warp;
        self.effects.push(GateEffect::WarpRequested(request));
        self.pending_warp = Some(self.bus.publish(request));
        true
    }

    fn on_key(&mut self, key: KeyEvent, now: Duration) {
        match self.state {
            GateState::AwaitingInteraction
                if !key.is_chord()
                    && matches!(key.code, KeyCode::Enter | KeyCode::Space | KeyCode::Escape) =>
            {
                self.advance(now, TransitionCause::Keyboard);
            }
            GateState::Geometrical if self.trigger.on_key(key) => {
                self.exit(now, TransitionCause::ExitKey);
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, timer: CascadeTimer, now: Duration) {
        match timer {
            CascadeTimer::Hint => {
                if self.state == GateState::AwaitingInteraction
                    && !self.guard.is_claimed()
                    && !self.hint_visible
                {
                    self.hint_visible = true;
                    self.effects.push(GateEffect::HintVisible(true));
                }
            }
            CascadeTimer::SoftFallback => {
                self.advance(now, TransitionCause::SoftFallback);
            }
            CascadeTimer::HardFailSafe => {
                self.advance(now, TransitionCause::HardFailSafe);
            }
        }
    }

    fn on_scroll(&mut self, offset_y: f64, now: Duration) -> bool {
        if self.state != GateState::Revealed || offset_y != 0.0 {
            return false;
        }
        self.set_state(GateState::Geometrical, TransitionCause::Reentry, now);
        true
    }

    fn poll_warp(&mut self, now: Duration) {
        let Some(outcome) = self.pending_warp.as_ref().and_then(WarpTicket::outcome) else {
            return;
        };
        self.pending_warp = None;
        if !outcome.is_completed() {
            tracing::warn!(%outcome, "exit warp did not complete, revealing anyway");
        }
        self.last_outcome = Some(outcome);

        if let Some(session) = self.session.as_mut()
            && let Err(err) = session.mark_done()
        {
            tracing::warn!(key = %session.key(), error = %err, "could not persist session flag");
        }

        self.set_state(GateState::Revealed, TransitionCause::Reveal, now);
        self.effects.push(GateEffect::Completed);
        if let Some(hook) = self.on_complete.as_mut() {
            hook();
        }
    }

    fn set_state(&mut self, to: GateState, cause: TransitionCause, now: Duration) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;

        if from == GateState::AwaitingInteraction {
            self.cascade.cancel_all();
            if self.hint_visible {
                self.hint_visible = false;
                self.effects.push(GateEffect::HintVisible(false));
            }
        }
        if to == GateState::Geometrical {
            self.trigger.reset();
        }

        if from.renders_gate() != to.renders_gate() {
            self.effects.push(GateEffect::GateMounted(to.renders_gate()));
        }
        if from.locks_scroll() != to.locks_scroll() {
            self.effects.push(GateEffect::ScrollLock(to.locks_scroll()));
        }
        if from.shows_chrome() != to.shows_chrome() {
            self.effects.push(GateEffect::ChromeVisible(to.shows_chrome()));
        }

        self.history.push(TransitionRecord {
            at: now,
            from,
            to,
            cause,
        });
        tracing::debug!(
            from = %from,
            to = %to,
            ?cause,
            at_ms = now.as_millis() as u64,
            "gate transition"
        );
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Whether the overlay is currently rendered.
    #[must_use]
    pub const fn is_gate_rendered(&self) -> bool {
        self.alive && self.state.renders_gate()
    }

    /// Whether the hint affordance is shown.
    #[must_use]
    pub const fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    /// Advance guard.
    #[must_use]
    pub const fn guard(&self) -> &AutoAdvanceGuard {
        &self.guard
    }

    /// Fallback cascade.
    #[must_use]
    pub const fn cascade(&self) -> &FallbackCascade {
        &self.cascade
    }

    /// Exit trigger.
    #[must_use]
    pub const fn trigger(&self) -> &ExitTrigger {
        &self.trigger
    }

    /// Every transition so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// How many times the exit edge fired.
    #[must_use]
    pub const fn exit_requests(&self) -> u64 {
        self.exit_requests
    }

    /// Outcome of the most recent settled exit warp.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&WarpOutcome> {
        self.last_outcome.as_ref()
    }

    /// Whether an exit warp is still pending.
    #[must_use]
    pub const fn is_awaiting_warp(&self) -> bool {
        self.pending_warp.is_some()
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }
}

impl fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionController")
            .field("state", &self.state)
            .field("guard", &self.guard)
            .field("alive", &self.alive)
            .field("session", &self.session)
            .field("pending_warp", &self.pending_warp)
            .field("exit_requests", &self.exit_requests)
            .finish_non_exhaustive()
    }
}
