//! Interaction controller module
//!
//! Provides the Hidden/Visible state machine that drives the selection
//! engine, the activator, and the presentation surface:
//! - Hidden: nothing on screen, waiting for the chord
//! - Visible: a hold session is open with its hold-check and refresh timers

mod command;
mod machine;
mod session;

pub use command::{channel, hotkey_sink, Command, CommandReceiver, CommandSender};
pub use machine::{Collaborators, InteractionController, Timing};
