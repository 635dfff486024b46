//! Messages posted into the interaction context

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::candidate::{CandidateList, SourceError};
use crate::hotkey::{HotkeyEvent, HotkeySink};
use crate::presentation::Gesture;

/// Everything the interaction controller reacts to
///
/// Timer ticks and background listings carry the generation of the
/// session that produced them; the controller drops any whose session is
/// no longer live.
#[derive(Debug)]
pub enum Command {
    /// Edge notification from the global hook
    Hotkey(HotkeyEvent),
    /// User gesture from a presentation surface
    Gesture(Gesture),
    /// Hold-check timer fired
    HoldCheck { generation: u64 },
    /// Refresh timer fired
    Refresh { generation: u64 },
    /// Background listing finished
    CandidatesLoaded {
        generation: u64,
        result: Result<CandidateList, SourceError>,
    },
}

pub type CommandSender = mpsc::Sender<Command>;
pub type CommandReceiver = mpsc::Receiver<Command>;

/// Create the interaction context's queue
pub fn channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    mpsc::channel(capacity)
}

/// Hook sink that posts edges into the interaction context
///
/// Runs on the hook thread, which must never block: a full queue drops the
/// event.
pub fn hotkey_sink(commands: CommandSender) -> HotkeySink {
    Box::new(move |event: HotkeyEvent| {
        if let Err(TrySendError::Full(_)) = commands.try_send(Command::Hotkey(event)) {
            warn!(?event, "command queue full, hotkey event dropped");
        }
    })
}
