//! holdswitch-daemon: hold-modifier application switcher for macOS
//!
//! This daemon runs as a LaunchAgent and provides:
//! - Global chord detection via CGEventTap (Option+Tab by default)
//! - An interaction controller that keeps the switcher open while the
//!   modifier is held and activates the selection on release
//! - IPC server through which a UI draws the switcher and sends gestures

mod candidate;
mod config;
mod controller;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod platform;
mod presentation;
mod selection;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::controller::{hotkey_sink, Collaborators, InteractionController};
use crate::events::SwitcherEvent;
use crate::hotkey::{HotkeyListener, SessionModifierProbe};
use crate::ipc::{Bridge, Server};
use crate::lifecycle::ShutdownSignal;
use crate::platform::{WorkspaceActivator, WorkspaceSource};
use crate::presentation::BroadcastSurface;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "holdswitch-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        chord = %config.chord,
        hold_check_ms = config.timing.hold_check.as_millis() as u64,
        refresh_ms = config.timing.refresh.as_millis() as u64,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new()?;

    // Hook thread, timers, IPC -> controller
    let (command_tx, command_rx) = controller::channel(64);
    // Controller -> IPC subscribers and the log
    let (event_tx, _event_rx) = broadcast::channel::<SwitcherEvent>(64);
    let surface = BroadcastSurface::new(64);

    let collaborators = Collaborators {
        source: Arc::new(WorkspaceSource::new(config.excluded.clone())),
        activator: Arc::new(WorkspaceActivator::new()),
        probe: Arc::new(SessionModifierProbe::new(config.chord.modifier)),
        surface: Arc::new(surface.clone()),
    };

    let mut controller = InteractionController::new(
        collaborators,
        config.timing,
        command_tx.clone(),
        event_tx.clone(),
    );

    // Create the hotkey listener
    let hotkey_listener = HotkeyListener::new(config.chord, config.swallow_chord);

    // Start the hotkey listener (runs on dedicated thread)
    let hotkey_registered = match hotkey_listener.start(hotkey_sink(command_tx.clone())) {
        Ok(()) => {
            info!("hotkey listener started");
            true
        }
        Err(e) => {
            error!(?e, "failed to start hotkey listener");
            warn!("continuing without hotkey support - check Accessibility permissions");
            false
        }
    };

    // Create IPC server bridged to the controller
    let server = Server::new(
        &config.socket_path,
        Bridge {
            commands: command_tx,
            views: surface,
            events: event_tx.clone(),
        },
    )?;
    server.set_hotkey(&config.chord, hotkey_registered).await;

    // Subscribe to switcher events for logging
    let mut log_event_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the interaction controller (owns all session state)
        _ = controller.run(command_rx) => {
            info!("interaction controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Log switcher events
        _ = async {
            loop {
                match log_event_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "switcher event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "switcher event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("switcher event logger exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    if hotkey_listener.is_running() {
        hotkey_listener.stop();
    }
    controller.shutdown();
    server.shutdown().await;

    info!("holdswitch-daemon stopped");

    Ok(())
}
