//! Hotkey module for global chord listening
//!
//! Uses macOS CGEventTap to watch for the switcher chord and a session
//! event source to query whether its modifier is still held.

mod keys;
mod listener;
mod probe;
mod registry;
mod tracker;

pub use keys::{Chord, Modifier};
pub use listener::{HotkeyEvent, HotkeyListener};
pub use probe::{ModifierProbe, SessionModifierProbe};
pub use registry::HotkeySink;
