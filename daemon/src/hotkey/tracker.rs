//! Chord edge detection
//!
//! Turns raw key down/up/flags events from the OS hook into at most one
//! chord notification per physical key transition. Platform independent so
//! the hook callback stays a thin translation layer.

use super::keys::{keycode, Chord, ModifierState};
use super::listener::HotkeyEvent;

/// Raw keyboard input as seen by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Down {
        keycode: u16,
        modifiers: ModifierState,
        autorepeat: bool,
    },
    Up {
        keycode: u16,
    },
    FlagsChanged(ModifierState),
}

/// What the hook should do with one input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Notification to post into the interaction context
    pub event: Option<HotkeyEvent>,
    /// The keystroke belongs to the chord and should not reach the focused app
    pub swallow: bool,
}

impl Outcome {
    fn pass() -> Self {
        Self::default()
    }

    fn swallow(event: Option<HotkeyEvent>) -> Self {
        Self {
            event,
            swallow: true,
        }
    }
}

#[derive(Debug)]
pub struct ChordTracker {
    chord: Chord,
    /// Chord key is physically down and its press was reported
    key_down: bool,
    /// A chord press happened during the current modifier hold
    ///
    /// Only the hook's own key stream clears this (Escape or a modifier
    /// release). If the switcher closes some other way, e.g. a commit sent
    /// over IPC, one Escape pressed before the modifier comes up is still
    /// swallowed.
    armed: bool,
}

impl ChordTracker {
    pub fn new(chord: Chord) -> Self {
        Self {
            chord,
            key_down: false,
            armed: false,
        }
    }

    pub fn feed(&mut self, input: KeyInput) -> Outcome {
        match input {
            KeyInput::Down {
                keycode: key,
                modifiers,
                autorepeat,
            } if key == self.chord.key && modifiers.contains(self.chord.modifier) => {
                if autorepeat && self.key_down {
                    return Outcome::swallow(None);
                }
                self.key_down = true;
                self.armed = true;
                let reverse = modifiers.shift && self.chord.modifier != super::Modifier::Shift;
                Outcome::swallow(Some(HotkeyEvent::ChordPressed { reverse }))
            }
            KeyInput::Down {
                keycode: keycode::ESCAPE,
                modifiers,
                ..
            } if self.armed && modifiers.contains(self.chord.modifier) => {
                self.armed = false;
                Outcome::swallow(Some(HotkeyEvent::CancelPressed))
            }
            KeyInput::Up { keycode: key } if key == self.chord.key && self.key_down => {
                self.key_down = false;
                Outcome::swallow(Some(HotkeyEvent::ChordReleased))
            }
            KeyInput::FlagsChanged(modifiers) => {
                if !modifiers.contains(self.chord.modifier) {
                    self.armed = false;
                }
                Outcome::pass()
            }
            _ => Outcome::pass(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::Modifier;

    fn option() -> ModifierState {
        ModifierState {
            option: true,
            ..Default::default()
        }
    }

    fn down(keycode: u16, modifiers: ModifierState) -> KeyInput {
        KeyInput::Down {
            keycode,
            modifiers,
            autorepeat: false,
        }
    }

    #[test]
    fn test_press_and_release_edges() {
        let mut tracker = ChordTracker::new(Chord::default());

        let pressed = tracker.feed(down(keycode::TAB, option()));
        assert_eq!(
            pressed,
            Outcome::swallow(Some(HotkeyEvent::ChordPressed { reverse: false }))
        );

        let released = tracker.feed(KeyInput::Up {
            keycode: keycode::TAB,
        });
        assert_eq!(released, Outcome::swallow(Some(HotkeyEvent::ChordReleased)));

        // A second release for the same transition is not reported
        let again = tracker.feed(KeyInput::Up {
            keycode: keycode::TAB,
        });
        assert_eq!(again, Outcome::pass());
    }

    #[test]
    fn test_autorepeat_is_swallowed_without_event() {
        let mut tracker = ChordTracker::new(Chord::default());
        tracker.feed(down(keycode::TAB, option()));

        let repeat = tracker.feed(KeyInput::Down {
            keycode: keycode::TAB,
            modifiers: option(),
            autorepeat: true,
        });
        assert_eq!(repeat, Outcome::swallow(None));
    }

    #[test]
    fn test_tab_without_modifier_passes_through() {
        let mut tracker = ChordTracker::new(Chord::default());
        let outcome = tracker.feed(down(keycode::TAB, ModifierState::default()));
        assert_eq!(outcome, Outcome::pass());

        let outcome = tracker.feed(KeyInput::Up {
            keycode: keycode::TAB,
        });
        assert_eq!(outcome, Outcome::pass());
    }

    #[test]
    fn test_shift_reverses() {
        let mut tracker = ChordTracker::new(Chord::default());
        let modifiers = ModifierState {
            option: true,
            shift: true,
            ..Default::default()
        };
        let outcome = tracker.feed(down(keycode::TAB, modifiers));
        assert_eq!(
            outcome.event,
            Some(HotkeyEvent::ChordPressed { reverse: true })
        );
    }

    #[test]
    fn test_shift_chord_never_reverses() {
        let mut tracker = ChordTracker::new(Chord {
            modifier: Modifier::Shift,
            key: keycode::SPACE,
        });
        let modifiers = ModifierState {
            shift: true,
            ..Default::default()
        };
        let outcome = tracker.feed(down(keycode::SPACE, modifiers));
        assert_eq!(
            outcome.event,
            Some(HotkeyEvent::ChordPressed { reverse: false })
        );
    }

    #[test]
    fn test_escape_cancels_only_while_armed() {
        let mut tracker = ChordTracker::new(Chord::default());

        // Not armed yet: escape belongs to the focused app
        assert_eq!(tracker.feed(down(keycode::ESCAPE, option())), Outcome::pass());

        tracker.feed(down(keycode::TAB, option()));
        tracker.feed(KeyInput::Up {
            keycode: keycode::TAB,
        });
        assert_eq!(
            tracker.feed(down(keycode::ESCAPE, option())),
            Outcome::swallow(Some(HotkeyEvent::CancelPressed))
        );

        // Cancelling disarms
        assert_eq!(tracker.feed(down(keycode::ESCAPE, option())), Outcome::pass());
    }

    #[test]
    fn test_modifier_release_disarms() {
        let mut tracker = ChordTracker::new(Chord::default());
        tracker.feed(down(keycode::TAB, option()));
        tracker.feed(KeyInput::Up {
            keycode: keycode::TAB,
        });
        tracker.feed(KeyInput::FlagsChanged(ModifierState::default()));

        assert_eq!(tracker.feed(down(keycode::ESCAPE, option())), Outcome::pass());
    }

    #[test]
    fn test_escape_stays_armed_until_modifier_release() {
        let mut tracker = ChordTracker::new(Chord::default());
        tracker.feed(down(keycode::TAB, option()));
        tracker.feed(KeyInput::Up {
            keycode: keycode::TAB,
        });

        // Other modifier changes while the chord modifier stays down keep it armed
        tracker.feed(KeyInput::FlagsChanged(ModifierState {
            option: true,
            shift: true,
            ..Default::default()
        }));
        tracker.feed(KeyInput::FlagsChanged(option()));
        assert_eq!(
            tracker.feed(down(keycode::ESCAPE, option())),
            Outcome::swallow(Some(HotkeyEvent::CancelPressed))
        );

        tracker.feed(down(keycode::TAB, option()));
        tracker.feed(KeyInput::FlagsChanged(ModifierState::default()));
        assert_eq!(tracker.feed(down(keycode::ESCAPE, option())), Outcome::pass());
    }
}
