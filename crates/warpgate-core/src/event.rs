#![forbid(unsafe_code)]

//! Canonical input events consumed by the gate.
//!
//! The host translates DOM input (`keydown`, `wheel`, `scroll`) and the
//! renderer's interaction callback into these values and pushes them into
//! the page driver. Nothing here reads from a browser directly.
//!
//! # Design Notes
//!
//! - Wheel deltas are signed integers in pixel-equivalent units; positive
//!   means downward motion.
//! - Scroll offsets are `f64` because browsers report sub-pixel `scrollY`.
//!   Consumers compare against exactly `0.0`.
//! - `KeyEventKind` defaults to `Press`; `Release` events never trigger
//!   transitions.

use bitflags::bitflags;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),

    /// A wheel event (`deltaY`).
    Wheel(WheelEvent),

    /// The page's vertical scroll offset changed.
    Scroll {
        /// New vertical scroll offset (`scrollY`).
        offset_y: f64,
    },

    /// The decorative scene reported a user interaction.
    Interaction,

    /// A frame tick from the host.
    Tick,
}

impl Event {
    /// Shorthand for a key press event.
    #[must_use]
    pub const fn key(code: KeyCode) -> Self {
        Self::Key(KeyEvent::new(code))
    }

    /// Shorthand for a wheel event with the given vertical delta.
    #[must_use]
    pub const fn wheel(delta_y: i32) -> Self {
        Self::Wheel(WheelEvent::new(delta_y))
    }

    /// Shorthand for a scroll-offset event.
    #[must_use]
    pub const fn scroll(offset_y: f64) -> Self {
        Self::Scroll { offset_y }
    }
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// Create a new key event with default modifiers and Press kind.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this event is a press or an auto-repeat (a DOM `keydown`).
    #[must_use]
    pub const fn is_down(&self) -> bool {
        matches!(self.kind, KeyEventKind::Press | KeyEventKind::Repeat)
    }

    /// Whether a command modifier is held (`Ctrl`, `Alt`, or `Meta`).
    ///
    /// Chords belong to the browser or the OS; the gate ignores them.
    /// `Shift` alone is not a chord.
    #[must_use]
    pub const fn is_chord(&self) -> bool {
        self.modifiers.intersects(Modifiers::CHORD)
    }
}

/// Key codes the gate distinguishes.
///
/// Everything the gate does not react to collapses into [`KeyCode::Char`]
/// or [`KeyCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Space bar.
    Space,

    /// Escape key.
    Escape,

    /// Up arrow key.
    Up,

    /// Down arrow key.
    Down,

    /// Page Up key.
    PageUp,

    /// Page Down key.
    PageDown,

    /// Any other named key.
    Other,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.key` value to a key code.
    ///
    /// ```
    /// use warpgate_core::event::KeyCode;
    ///
    /// assert_eq!(KeyCode::from_dom_key("ArrowDown"), KeyCode::Down);
    /// assert_eq!(KeyCode::from_dom_key(" "), KeyCode::Space);
    /// assert_eq!(KeyCode::from_dom_key("q"), KeyCode::Char('q'));
    /// ```
    #[must_use]
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Enter" => Self::Enter,
            " " | "Spacebar" => Self::Space,
            "Escape" | "Esc" => Self::Escape,
            "ArrowUp" | "Up" => Self::Up,
            "ArrowDown" | "Down" => Self::Down,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other,
                }
            }
        }
    }
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    /// Modifiers that turn a key into a command chord.
    pub const CHORD: Self = Self::CTRL.union(Self::ALT).union(Self::SUPER);

    /// Build from DOM `KeyboardEvent` flags.
    #[must_use]
    pub const fn from_dom(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut bits = 0;
        if shift {
            bits |= Self::SHIFT.bits();
        }
        if alt {
            bits |= Self::ALT.bits();
        }
        if ctrl {
            bits |= Self::CTRL.bits();
        }
        if meta {
            bits |= Self::SUPER.bits();
        }
        Self::from_bits_truncate(bits)
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// A wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelEvent {
    /// Vertical delta; positive is downward.
    pub delta_y: i32,
}

impl WheelEvent {
    /// Create a wheel event.
    #[must_use]
    pub const fn new(delta_y: i32) -> Self {
        Self { delta_y }
    }

    /// Whether this event moves the page downward.
    #[must_use]
    pub const fn is_downward(&self) -> bool {
        self.delta_y > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_defaults_to_press() {
        let ev = KeyEvent::new(KeyCode::Enter);
        assert_eq!(ev.kind, KeyEventKind::Press);
        assert_eq!(ev.modifiers, Modifiers::NONE);
        assert!(ev.is_down());
    }

    #[test]
    fn release_is_not_down() {
        let ev = KeyEvent::new(KeyCode::Space).with_kind(KeyEventKind::Release);
        assert!(!ev.is_down());
        let ev = KeyEvent::new(KeyCode::Space).with_kind(KeyEventKind::Repeat);
        assert!(ev.is_down());
    }

    #[test]
    fn dom_keys_map_to_gate_keys() {
        assert_eq!(KeyCode::from_dom_key("Enter"), KeyCode::Enter);
        assert_eq!(KeyCode::from_dom_key(" "), KeyCode::Space);
        assert_eq!(KeyCode::from_dom_key("Escape"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("Esc"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("ArrowDown"), KeyCode::Down);
        assert_eq!(KeyCode::from_dom_key("PageDown"), KeyCode::PageDown);
        assert_eq!(KeyCode::from_dom_key("ArrowUp"), KeyCode::Up);
    }

    #[test]
    fn chords_need_a_command_modifier() {
        let plain = KeyEvent::new(KeyCode::Down);
        assert!(!plain.is_chord());
        assert!(!plain.with_modifiers(Modifiers::SHIFT).is_chord());
        assert!(plain.with_modifiers(Modifiers::CTRL).is_chord());
        assert!(plain.with_modifiers(Modifiers::SHIFT | Modifiers::ALT).is_chord());
    }

    #[test]
    fn modifiers_from_dom_flags() {
        assert_eq!(Modifiers::from_dom(false, false, false, false), Modifiers::NONE);
        assert_eq!(
            Modifiers::from_dom(true, false, false, true),
            Modifiers::SHIFT | Modifiers::SUPER
        );
        assert!(Modifiers::from_dom(false, false, true, false).intersects(Modifiers::CHORD));
    }

    #[test]
    fn unknown_dom_keys() {
        assert_eq!(KeyCode::from_dom_key("x"), KeyCode::Char('x'));
        assert_eq!(KeyCode::from_dom_key("F5"), KeyCode::Other);
        assert_eq!(KeyCode::from_dom_key(""), KeyCode::Other);
    }

    #[test]
    fn modifiers_combine() {
        let ev = KeyEvent::new(KeyCode::Down).with_modifiers(Modifiers::SHIFT | Modifiers::CTRL);
        assert!(ev.modifiers.contains(Modifiers::SHIFT));
        assert!(ev.modifiers.contains(Modifiers::CTRL));
        assert!(!ev.modifiers.contains(Modifiers::ALT));
    }

    #[test]
    fn wheel_direction() {
        assert!(WheelEvent::new(1).is_downward());
        assert!(!WheelEvent::new(0).is_downward());
        assert!(!WheelEvent::new(-40).is_downward());
        assert_eq!(Event::wheel(60), Event::Wheel(WheelEvent { delta_y: 60 }));
    }
}
