//! Process-wide slot for the global hook
//!
//! The OS keyboard hook is a process-wide resource, so exactly one sink may
//! receive its notifications at a time. Registering hands back a
//! [`HookRegistration`]; dropping it empties the slot, after which
//! [`dispatch`] becomes a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use super::listener::{HotkeyError, HotkeyEvent};

/// Posts one notification into the interaction context; must not block
pub type HotkeySink = Box<dyn Fn(HotkeyEvent) + Send + Sync>;

struct Slot {
    token: u64,
    sink: Arc<HotkeySink>,
}

static SLOT: Mutex<Option<Slot>> = Mutex::new(None);
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Lifecycle handle for the registered sink
#[derive(Debug)]
pub struct HookRegistration {
    token: u64,
}

/// Install `sink` as the receiver of hook notifications
pub fn register(sink: HotkeySink) -> Result<HookRegistration, HotkeyError> {
    let mut slot = SLOT.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(HotkeyError::AlreadyRegistered);
    }

    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    *slot = Some(Slot {
        token,
        sink: Arc::new(sink),
    });
    debug!(token, "hook sink registered");
    Ok(HookRegistration { token })
}

/// Forward a notification from the hook callback
///
/// Returns false when no sink is registered.
pub fn dispatch(event: HotkeyEvent) -> bool {
    let sink = {
        let slot = SLOT.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(slot) => Arc::clone(&slot.sink),
            None => {
                trace!(?event, "no hook sink registered, dropping");
                return false;
            }
        }
    };
    (**sink)(event);
    true
}

impl Drop for HookRegistration {
    fn drop(&mut self) {
        let mut slot = SLOT.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|s| s.token == self.token) {
            *slot = None;
            debug!(token = self.token, "hook sink unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    // The slot is process-wide, so the whole lifecycle lives in one test.
    #[test]
    fn test_registration_lifecycle() {
        let count = Arc::new(AtomicUsize::new(0));

        assert!(!dispatch(HotkeyEvent::ChordReleased));

        let seen = Arc::clone(&count);
        let registration = register(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

        assert!(matches!(
            register(Box::new(|_| {})),
            Err(HotkeyError::AlreadyRegistered)
        ));

        assert!(dispatch(HotkeyEvent::ChordPressed { reverse: false }));
        assert!(dispatch(HotkeyEvent::ChordReleased));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(registration);
        assert!(!dispatch(HotkeyEvent::ChordReleased));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let again = register(Box::new(|_| {}));
        assert!(again.is_ok());
    }
}
