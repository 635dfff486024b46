//! Interaction controller implementation
//!
//! Owns the Hidden/Visible state machine. Every mutation of selection or
//! visibility happens inside [`InteractionController::handle`], which runs
//! on a single task; the hook thread, timers, and background listings only
//! ever post [`Command`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::candidate::{Activator, CandidateList, CandidateSource, SourceError};
use crate::events::SwitcherEvent;
use crate::hotkey::{HotkeyEvent, ModifierProbe};
use crate::presentation::{Gesture, PresentationSurface, SwitcherView};
use crate::selection::{Selection, SelectionEngine};

use super::command::{Command, CommandReceiver, CommandSender};
use super::session::{HoldSession, TimerKind};

/// Visibility of the switcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Nothing on screen, waiting for the chord
    #[default]
    Hidden,
    /// List on screen, a session is open
    Visible,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Hidden => write!(f, "Hidden"),
            State::Visible => write!(f, "Visible"),
        }
    }
}

/// External collaborators the controller drives
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn CandidateSource>,
    pub activator: Arc<dyn Activator>,
    pub probe: Arc<dyn ModifierProbe>,
    pub surface: Arc<dyn PresentationSurface>,
}

/// Timer periods for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub hold_check: Duration,
    pub refresh: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            hold_check: Duration::from_millis(50),
            refresh: Duration::from_secs(3),
        }
    }
}

pub struct InteractionController {
    engine: SelectionEngine,
    session: Option<HoldSession>,
    /// Generation of the most recently opened session
    generation: u64,
    collaborators: Collaborators,
    timing: Timing,
    /// Loopback for timers and background listings
    commands: CommandSender,
    event_tx: broadcast::Sender<SwitcherEvent>,
}

impl InteractionController {
    pub fn new(
        collaborators: Collaborators,
        timing: Timing,
        commands: CommandSender,
        event_tx: broadcast::Sender<SwitcherEvent>,
    ) -> Self {
        Self {
            engine: SelectionEngine::new(),
            session: None,
            generation: 0,
            collaborators,
            timing,
            commands,
            event_tx,
        }
    }

    pub fn state(&self) -> State {
        if self.session.is_some() {
            State::Visible
        } else {
            State::Hidden
        }
    }

    /// Process commands until the queue closes
    pub async fn run(&mut self, mut commands: CommandReceiver) {
        info!("interaction controller started in Hidden state");

        while let Some(command) = commands.recv().await {
            self.handle(command);
        }

        info!("interaction controller stopped");
    }

    /// Close any open session without activating, for shutdown
    pub fn shutdown(&mut self) {
        self.hide();
    }

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Hotkey(event) => self.handle_hotkey(event),
            Command::Gesture(gesture) => self.handle_gesture(gesture),
            Command::HoldCheck { generation } => self.handle_hold_check(generation),
            Command::Refresh { generation } => self.handle_refresh(generation),
            Command::CandidatesLoaded { generation, result } => {
                self.handle_candidates_loaded(generation, result)
            }
        }
    }

    fn handle_hotkey(&mut self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::ChordPressed { reverse } => {
                if self.state() == State::Hidden {
                    self.show(false);
                    if reverse {
                        self.move_selection(SelectionEngine::select_previous);
                    }
                    return;
                }

                // Already visible: the press is a cycle request
                let hold_check = self.timing.hold_check;
                if let Some(session) = self.session.as_mut().filter(|s| s.pinned()) {
                    debug!(generation = session.generation(), "chord press adopts pinned session");
                    session.adopt_hold(hold_check, &self.commands);
                }
                if reverse {
                    self.move_selection(SelectionEngine::select_previous);
                } else {
                    self.move_selection(SelectionEngine::select_next);
                }
            }
            HotkeyEvent::ChordReleased => {
                // Tap key released; the modifier may or may not still be down
                if self.session.as_ref().is_some_and(|s| !s.pinned()) {
                    self.check_hold();
                }
            }
            HotkeyEvent::CancelPressed => self.hide(),
            HotkeyEvent::TapDisabled => {
                warn!("hotkey tap was disabled by the system, chord events may have been missed");
            }
        }
    }

    fn handle_gesture(&mut self, gesture: Gesture) {
        if self.state() == State::Hidden && !matches!(gesture, Gesture::Show | Gesture::Hide) {
            debug!(?gesture, "ignoring gesture while hidden");
            return;
        }

        match gesture {
            Gesture::SelectNext => self.move_selection(SelectionEngine::select_next),
            Gesture::SelectPrevious => self.move_selection(SelectionEngine::select_previous),
            Gesture::SetSelectedIndex(index) => {
                self.move_selection(|engine| engine.set_selected_index(index))
            }
            Gesture::Commit(index) => {
                if let Some(index) = index {
                    self.engine.set_selected_index(index);
                }
                self.commit();
            }
            Gesture::Cancel | Gesture::Hide => self.hide(),
            Gesture::Show => {
                self.show(true);
            }
        }
    }

    fn handle_hold_check(&mut self, generation: u64) {
        let live = self
            .session
            .as_ref()
            .is_some_and(|s| s.generation() == generation && !s.pinned());
        if live {
            self.check_hold();
        } else {
            trace!(generation, "ignoring hold-check tick from a closed session");
        }
    }

    fn handle_refresh(&mut self, generation: u64) {
        let Some(session) = self.live_session_mut(generation) else {
            trace!(generation, "ignoring refresh tick from a closed session");
            return;
        };
        if session.refresh_pending() {
            debug!(generation, "previous refresh still running, skipping");
            return;
        }
        session.set_refresh_pending(true);

        let source = Arc::clone(&self.collaborators.source);
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || source.list())
                .await
                .unwrap_or_else(|e| Err(SourceError::Task(e.to_string())));
            if commands
                .send(Command::CandidatesLoaded { generation, result })
                .await
                .is_err()
            {
                debug!(generation, "controller gone before refresh completed");
            }
        });
    }

    fn handle_candidates_loaded(
        &mut self,
        generation: u64,
        result: Result<CandidateList, SourceError>,
    ) {
        match self.live_session_mut(generation) {
            Some(session) => session.set_refresh_pending(false),
            None => {
                debug!(generation, "dropping listing from a closed session");
                self.emit(SwitcherEvent::StaleResultDropped { generation });
                return;
            }
        }

        match result {
            Ok(list) => {
                if self.engine.reconcile(list) {
                    self.render();
                }
            }
            Err(e) => self.report_source_failure(e),
        }
    }

    /// Open a session; a no-op when one is already open
    ///
    /// Returns whether a new session was opened.
    pub fn show(&mut self, pinned: bool) -> bool {
        if let Some(session) = &self.session {
            debug!(generation = session.generation(), "already visible, show ignored");
            return false;
        }

        self.generation += 1;
        let mut session = HoldSession::new(self.generation, pinned);

        self.engine.reset();
        match self.collaborators.source.list() {
            Ok(list) => {
                self.engine.reconcile(list);
            }
            Err(e) => self.report_source_failure(e),
        }

        if !pinned {
            session.start_timer(TimerKind::HoldCheck, self.timing.hold_check, &self.commands);
        }
        session.start_timer(TimerKind::Refresh, self.timing.refresh, &self.commands);
        self.session = Some(session);

        info!(
            from = %State::Hidden,
            to = %State::Visible,
            generation = self.generation,
            candidates = self.engine.len(),
            pinned,
            "state transition"
        );
        self.emit(SwitcherEvent::Shown {
            candidates: self.engine.len(),
            pinned,
        });
        self.render();
        true
    }

    /// Close the session without activating anything
    ///
    /// Safe to call in any state, any number of times.
    pub fn hide(&mut self) {
        match self.end_session() {
            Some(duration_ms) => {
                info!(duration_ms, "switcher cancelled");
                self.emit(SwitcherEvent::Cancelled { duration_ms });
            }
            None => trace!("hide while already hidden"),
        }
    }

    fn live_session_mut(&mut self, generation: u64) -> Option<&mut HoldSession> {
        self.session
            .as_mut()
            .filter(|session| session.generation() == generation)
    }

    fn check_hold(&mut self) {
        if self.collaborators.probe.is_held() {
            trace!("modifier still held");
        } else {
            debug!("modifier released, committing");
            self.commit();
        }
    }

    /// Activate the current selection and close
    fn commit(&mut self) {
        if self.session.is_none() {
            return;
        }

        let selected = self.engine.current_selection().cloned();
        match &selected {
            Some(candidate) => {
                info!(id = %candidate.id, name = %candidate.name, "activating selection");
                if let Err(e) = self.collaborators.activator.activate(candidate) {
                    warn!(id = %candidate.id, error = %e, "activation failed");
                    self.emit(SwitcherEvent::ActivationFailed {
                        id: candidate.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
            None => debug!("nothing selected, closing without activation"),
        }

        let Some(duration_ms) = self.end_session() else {
            return;
        };
        match selected {
            Some(candidate) => self.emit(SwitcherEvent::Committed {
                id: candidate.id,
                duration_ms,
            }),
            None => self.emit(SwitcherEvent::Cancelled { duration_ms }),
        }
    }

    /// Tear down the session and its timers; returns how long it was open
    fn end_session(&mut self) -> Option<u64> {
        let mut session = self.session.take()?;
        session.cancel_timers();
        let duration_ms = session.elapsed_ms();

        info!(
            from = %State::Visible,
            to = %State::Hidden,
            generation = session.generation(),
            duration_ms,
            "state transition"
        );
        self.render();
        Some(duration_ms)
    }

    fn move_selection(&mut self, step: impl FnOnce(&mut SelectionEngine) -> bool) {
        let before = self.engine.selected_index();
        step(&mut self.engine);
        let index = self.engine.selected_index();
        if index != before {
            debug!(from = before, to = index, "selection moved");
            self.emit(SwitcherEvent::SelectionMoved { index });
            self.render();
        }
    }

    fn report_source_failure(&self, error: SourceError) {
        warn!(error = %error, "candidate source failed");
        self.emit(SwitcherEvent::SourceFailed {
            message: error.to_string(),
        });
    }

    fn view(&self) -> SwitcherView {
        let Selection {
            list,
            selected_index,
        } = self.engine.snapshot();
        SwitcherView {
            visible: self.session.is_some(),
            candidates: list,
            selected_index,
        }
    }

    fn render(&self) {
        self.collaborators.surface.render(&self.view());
    }

    fn emit(&self, event: SwitcherEvent) {
        debug!(%event, "emitting switcher event");
        let _ = self.event_tx.send(event);
    }

    #[cfg(test)]
    fn session(&self) -> Option<&HoldSession> {
        self.session.as_ref()
    }
}
