//! Live "is the modifier held" query
//!
//! Release notifications for the tap key and the held modifier arrive
//! independently, so the controller polls the modifier level instead.

use super::keys::Modifier;

pub trait ModifierProbe: Send + Sync {
    fn is_held(&self) -> bool;
}

/// Reads the combined session keyboard state
#[derive(Debug, Clone, Copy)]
pub struct SessionModifierProbe {
    modifier: Modifier,
}

impl SessionModifierProbe {
    pub fn new(modifier: Modifier) -> Self {
        Self { modifier }
    }
}

#[cfg(target_os = "macos")]
impl ModifierProbe for SessionModifierProbe {
    fn is_held(&self) -> bool {
        use core_graphics::event::CGEvent;
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
        use tracing::warn;

        use super::keys::ModifierState;

        // A fresh event carries the current modifier flags of its source.
        // Reporting "released" on failure closes the switcher instead of
        // leaving it stuck open.
        let Ok(source) = CGEventSource::new(CGEventSourceStateID::CombinedSessionState) else {
            warn!("failed to create event source for modifier query");
            return false;
        };
        let Ok(event) = CGEvent::new(source) else {
            warn!("failed to create event for modifier query");
            return false;
        };
        ModifierState::from_flags(event.get_flags()).contains(self.modifier)
    }
}

#[cfg(not(target_os = "macos"))]
impl ModifierProbe for SessionModifierProbe {
    fn is_held(&self) -> bool {
        tracing::trace!(modifier = %self.modifier, "no modifier state on this platform");
        false
    }
}
