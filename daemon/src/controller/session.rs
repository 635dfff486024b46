//! Per-visibility session state and its timers

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::command::{Command, CommandSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Polls the modifier level
    HoldCheck,
    /// Re-queries the candidate source
    Refresh,
}

/// Periodic timer task; aborted when dropped
#[derive(Debug)]
struct TimerGuard {
    handle: JoinHandle<()>,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Lives exactly as long as the switcher is visible
#[derive(Debug)]
pub struct HoldSession {
    generation: u64,
    /// Opened without a held modifier (no hold-check)
    pinned: bool,
    opened_at: Instant,
    refresh_pending: bool,
    hold_check: Option<TimerGuard>,
    refresh: Option<TimerGuard>,
}

impl HoldSession {
    pub fn new(generation: u64, pinned: bool) -> Self {
        Self {
            generation,
            pinned,
            opened_at: Instant::now(),
            refresh_pending: false,
            hold_check: None,
            refresh: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pinned(&self) -> bool {
        self.pinned
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.opened_at.elapsed().as_millis() as u64
    }

    pub fn refresh_pending(&self) -> bool {
        self.refresh_pending
    }

    pub fn set_refresh_pending(&mut self, pending: bool) {
        self.refresh_pending = pending;
    }

    /// Turn a pinned session into a held one
    pub fn adopt_hold(&mut self, period: Duration, commands: &CommandSender) {
        self.pinned = false;
        if !self.is_running(TimerKind::HoldCheck) {
            self.start_timer(TimerKind::HoldCheck, period, commands);
        }
    }

    /// Start a periodic timer, cancelling any running timer of the same kind
    pub fn start_timer(&mut self, kind: TimerKind, period: Duration, commands: &CommandSender) {
        let guard = TimerGuard {
            handle: spawn_ticker(kind, period, self.generation, commands.clone()),
        };
        let slot = match kind {
            TimerKind::HoldCheck => &mut self.hold_check,
            TimerKind::Refresh => &mut self.refresh,
        };
        if slot.replace(guard).is_some() {
            debug!(?kind, generation = self.generation, "replaced running timer");
        }
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::HoldCheck => self.hold_check.is_some(),
            TimerKind::Refresh => self.refresh.is_some(),
        }
    }

    pub fn cancel_timers(&mut self) {
        self.hold_check = None;
        self.refresh = None;
    }
}

fn spawn_ticker(
    kind: TimerKind,
    period: Duration,
    generation: u64,
    commands: CommandSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = time::interval_at(time::Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let command = match kind {
                TimerKind::HoldCheck => Command::HoldCheck { generation },
                TimerKind::Refresh => Command::Refresh { generation },
            };
            if commands.send(command).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::command;

    #[tokio::test(start_paused = true)]
    async fn test_timer_posts_tagged_ticks() {
        let (tx, mut rx) = command::channel(8);
        let mut session = HoldSession::new(7, false);
        session.start_timer(TimerKind::HoldCheck, Duration::from_millis(50), &tx);

        match rx.recv().await {
            Some(Command::HoldCheck { generation }) => assert_eq!(generation, 7),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timers_stop_ticking() {
        let (tx, mut rx) = command::channel(8);
        let mut session = HoldSession::new(1, false);
        session.start_timer(TimerKind::HoldCheck, Duration::from_millis(50), &tx);
        session.start_timer(TimerKind::Refresh, Duration::from_millis(200), &tx);
        session.cancel_timers();
        assert!(!session.is_running(TimerKind::HoldCheck));
        assert!(!session.is_running(TimerKind::Refresh));

        let next = time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(next.is_err(), "cancelled timer still ticking");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_timer_replaces_previous() {
        let (tx, mut rx) = command::channel(8);
        let mut session = HoldSession::new(3, false);
        session.start_timer(TimerKind::HoldCheck, Duration::from_millis(50), &tx);
        session.start_timer(TimerKind::HoldCheck, Duration::from_millis(50), &tx);

        // Only one ticker survives: two ticks take two periods
        let started = time::Instant::now();
        rx.recv().await;
        rx.recv().await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adopt_hold_unpins() {
        let (tx, _rx) = command::channel(8);
        let mut session = HoldSession::new(1, true);
        assert!(!session.is_running(TimerKind::HoldCheck));

        session.adopt_hold(Duration::from_millis(50), &tx);
        assert!(!session.pinned());
        assert!(session.is_running(TimerKind::HoldCheck));
    }
}
