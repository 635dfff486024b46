//! Global chord listener using macOS CGEventTap
//!
//! Monitors system-wide key events for the switcher chord. Runs on a
//! dedicated thread with its own CFRunLoop; notifications leave that
//! thread only through the hook registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use super::keys::Chord;
use super::registry::{self, HookRegistration, HotkeySink};

/// Notifications sent from the hook to the interaction controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Chord key went down while the modifier was held
    ChordPressed {
        /// Shift was also held
        reverse: bool,
    },
    /// Chord key came back up
    ChordReleased,
    /// Escape pressed during a chord hold
    CancelPressed,
    /// Event tap was disabled by macOS (it is re-enabled by the listener)
    TapDisabled,
}

/// Global hook that reports chord presses and releases
pub struct HotkeyListener {
    chord: Chord,
    swallow: bool,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    /// Create a new listener for `chord`
    ///
    /// With `swallow` set, chord keystrokes are removed from the event
    /// stream so the focused application never sees them.
    pub fn new(chord: Chord, swallow: bool) -> Self {
        Self {
            chord,
            swallow,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the listener
    ///
    /// Registers `sink` as the process-wide hook receiver, then spawns a
    /// dedicated thread that runs a CFRunLoop for the event tap. Returns
    /// once the tap is installed (or failed to install).
    pub fn start(&self, sink: HotkeySink) -> Result<(), HotkeyError> {
        if !cfg!(target_os = "macos") {
            return Err(HotkeyError::Unsupported);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let result = registry::register(sink).and_then(|registration| self.spawn(registration));
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    fn spawn(&self, registration: HookRegistration) -> Result<(), HotkeyError> {
        let chord = self.chord;
        let swallow = self.swallow;
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!(%chord, "hotkey listener thread started");

                if let Err(e) = run_event_loop(chord, swallow, &running, &ready_tx) {
                    error!(?e, "hotkey listener error");
                    let _ = ready_tx.send(Err(e));
                }

                drop(registration);
                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| HotkeyError::ThreadSpawn("listener thread exited early".to_string()))?
    }

    /// Stop the listener; the run loop exits within one polling interval
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("another hook sink is already registered")]
    AlreadyRegistered,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to attach event tap to the run loop")]
    RunLoopSource,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("global hotkeys are not supported on this platform")]
    Unsupported,
}

type Ready = std::sync::mpsc::Sender<Result<(), HotkeyError>>;

/// Run the CFRunLoop with the event tap
#[cfg(target_os = "macos")]
fn run_event_loop(
    chord: Chord,
    swallow: bool,
    running: &AtomicBool,
    ready: &Ready,
) -> Result<(), HotkeyError> {
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventType, EventField,
    };
    use tracing::{debug, warn};

    use super::keys::ModifierState;
    use super::tracker::{ChordTracker, KeyInput};

    let tracker = RefCell::new(ChordTracker::new(chord));
    let tap_disabled = Cell::new(false);

    // CGEventTap callback - must be fast and non-blocking
    let callback = |_proxy: core_graphics::event::CGEventTapProxy,
                    event_type: CGEventType,
                    event: &CGEvent|
     -> Option<CGEvent> {
        let keycode = || event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
        let input = match event_type {
            CGEventType::KeyDown => KeyInput::Down {
                keycode: keycode(),
                modifiers: ModifierState::from_flags(event.get_flags()),
                autorepeat: event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT)
                    != 0,
            },
            CGEventType::KeyUp => KeyInput::Up { keycode: keycode() },
            CGEventType::FlagsChanged => {
                KeyInput::FlagsChanged(ModifierState::from_flags(event.get_flags()))
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled, will re-enable");
                tap_disabled.set(true);
                registry::dispatch(HotkeyEvent::TapDisabled);
                return Some(event.clone());
            }
            _ => return Some(event.clone()),
        };

        let outcome = tracker.borrow_mut().feed(input);
        if let Some(hotkey_event) = outcome.event {
            debug!(?hotkey_event, "chord edge");
            registry::dispatch(hotkey_event);
        }

        if swallow && outcome.swallow {
            None
        } else {
            Some(event.clone())
        }
    };

    let options = if swallow {
        CGEventTapOptions::Default
    } else {
        CGEventTapOptions::ListenOnly
    };

    // Create the event tap
    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        options,
        vec![
            CGEventType::KeyDown,
            CGEventType::KeyUp,
            CGEventType::FlagsChanged,
        ],
        callback,
    )
    .map_err(|_| {
        error!("failed to create event tap - is Accessibility permission granted?");
        HotkeyError::EventTapCreation
    })?;

    // Enable the tap
    tap.enable();

    // Create a run loop source and add it to the current run loop
    let run_loop_source = tap
        .mach_port
        .create_runloop_source(0)
        .map_err(|_| HotkeyError::RunLoopSource)?;
    let run_loop = CFRunLoop::get_current();

    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        // Callbacks run inside this call; wake up periodically to notice stop()
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_millis(100), true);
        }

        if tap_disabled.replace(false) {
            tap.enable();
            info!("event tap re-enabled");
        }
    }

    // Tap will be automatically cleaned up when it goes out of scope

    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_event_loop(
    _chord: Chord,
    _swallow: bool,
    _running: &AtomicBool,
    _ready: &Ready,
) -> Result<(), HotkeyError> {
    Err(HotkeyError::Unsupported)
}
