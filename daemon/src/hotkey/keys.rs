//! Modifier and chord definitions
//!
//! Provides the modifier keys the switcher can be held on, a struct for
//! tracking which modifiers are down, and the `<modifier>+<key>` chord
//! that opens the switcher.

use std::fmt;
use std::str::FromStr;

/// Modifier key flag masks from macOS CGEventFlags
#[cfg(target_os = "macos")]
pub mod flags {
    use core_graphics::event::CGEventFlags;

    /// Control key modifier flag
    pub const CONTROL: CGEventFlags = CGEventFlags::CGEventFlagControl;
    /// Option/Alt key modifier flag
    pub const OPTION: CGEventFlags = CGEventFlags::CGEventFlagAlternate;
    /// Command key modifier flag
    pub const COMMAND: CGEventFlags = CGEventFlags::CGEventFlagCommand;
    /// Shift key modifier flag
    pub const SHIFT: CGEventFlags = CGEventFlags::CGEventFlagShift;
}

/// Virtual key codes (kVK_*) for the keys a chord can use
pub mod keycode {
    pub const TAB: u16 = 48;
    pub const SPACE: u16 = 49;
    pub const GRAVE: u16 = 50;
    pub const ESCAPE: u16 = 53;
}

/// A modifier the switcher can be held on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Option,
    Command,
    Shift,
}

impl Modifier {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "control" | "ctrl" => Some(Self::Control),
            "option" | "alt" | "opt" => Some(Self::Option),
            "command" | "cmd" => Some(Self::Command),
            "shift" => Some(Self::Shift),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modifier::Control => "control",
            Modifier::Option => "option",
            Modifier::Command => "command",
            Modifier::Shift => "shift",
        };
        f.write_str(name)
    }
}

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    /// Create a new ModifierState from CGEventFlags
    #[cfg(target_os = "macos")]
    pub fn from_flags(event_flags: core_graphics::event::CGEventFlags) -> Self {
        Self {
            control: event_flags.contains(flags::CONTROL),
            option: event_flags.contains(flags::OPTION),
            command: event_flags.contains(flags::COMMAND),
            shift: event_flags.contains(flags::SHIFT),
        }
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Control => self.control,
            Modifier::Option => self.option,
            Modifier::Command => self.command,
            Modifier::Shift => self.shift,
        }
    }
}

/// The trigger: hold `modifier`, tap `key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    pub modifier: Modifier,
    pub key: u16,
}

impl Default for Chord {
    fn default() -> Self {
        Self {
            modifier: Modifier::Option,
            key: keycode::TAB,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("chord must look like <modifier>+<key>, got {0:?}")]
    Malformed(String),

    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),

    #[error("unknown key {0:?}")]
    UnknownKey(String),
}

fn parse_key(name: &str) -> Option<u16> {
    match name {
        "tab" => Some(keycode::TAB),
        "space" => Some(keycode::SPACE),
        "grave" | "`" => Some(keycode::GRAVE),
        "escape" | "esc" => None,
        other => other.parse().ok().filter(|k| *k != keycode::ESCAPE),
    }
}

impl FromStr for Chord {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let (modifier, key) = normalized
            .split_once('+')
            .ok_or_else(|| ChordParseError::Malformed(s.to_string()))?;
        let (modifier, key) = (modifier.trim(), key.trim());

        let modifier = Modifier::parse(modifier)
            .ok_or_else(|| ChordParseError::UnknownModifier(modifier.to_string()))?;
        // Escape is reserved for cancelling an open switcher
        let key = parse_key(key).ok_or_else(|| ChordParseError::UnknownKey(key.to_string()))?;

        Ok(Self { modifier, key })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            keycode::TAB => write!(f, "{}+tab", self.modifier),
            keycode::SPACE => write!(f, "{}+space", self.modifier),
            keycode::GRAVE => write!(f, "{}+grave", self.modifier),
            other => write!(f, "{}+{}", self.modifier, other),
        }
    }
}
