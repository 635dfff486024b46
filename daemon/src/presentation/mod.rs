//! Presentation surface contract
//!
//! The controller pushes a [`SwitcherView`] after every state change; the
//! surface sends user gestures back as [`Gesture`] values. Drawing rows,
//! icons, and window chrome is the surface's business.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::candidate::CandidateList;

/// Everything a surface needs to draw the switcher
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwitcherView {
    pub visible: bool,
    pub candidates: CandidateList,
    pub selected_index: usize,
}

impl SwitcherView {
    pub fn hidden() -> Self {
        Self::default()
    }
}

/// User gestures forwarded from a surface into the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SelectNext,
    SelectPrevious,
    /// Pointer hover or single click on a row
    SetSelectedIndex(usize),
    /// Double-activate on a row, or commit the current row when `None`
    Commit(Option<usize>),
    /// Escape or dismiss
    Cancel,
    /// Open a pinned session without a held modifier
    Show,
    /// Close without activating
    Hide,
}

/// Receives a view on every state change
pub trait PresentationSurface: Send + Sync {
    fn render(&self, view: &SwitcherView);
}

/// Surface that fans views out to any number of subscribers
///
/// Used by the IPC server so that out-of-process UIs can draw the
/// switcher. The most recent view is kept so late subscribers start from
/// what is on screen.
#[derive(Debug, Clone)]
pub struct BroadcastSurface {
    tx: broadcast::Sender<SwitcherView>,
    latest: Arc<watch::Sender<SwitcherView>>,
}

impl BroadcastSurface {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (latest, _) = watch::channel(SwitcherView::hidden());
        Self {
            tx,
            latest: Arc::new(latest),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwitcherView> {
        self.tx.subscribe()
    }

    /// Subscribe and read the current view
    ///
    /// A view rendered concurrently may show up both as the current view
    /// and on the receiver, never in neither.
    pub fn subscribe_with_current(&self) -> (SwitcherView, broadcast::Receiver<SwitcherView>) {
        let rx = self.tx.subscribe();
        let current = self.latest.borrow().clone();
        (current, rx)
    }

    pub fn current(&self) -> SwitcherView {
        self.latest.borrow().clone()
    }
}

impl PresentationSurface for BroadcastSurface {
    fn render(&self, view: &SwitcherView) {
        self.latest.send_replace(view.clone());
        let receivers = self.tx.send(view.clone()).unwrap_or(0);
        trace!(
            visible = view.visible,
            selected = view.selected_index,
            receivers,
            "view pushed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, CandidateId};

    #[test]
    fn test_broadcast_surface_delivers_views() {
        let surface = BroadcastSurface::new(4);
        let mut rx = surface.subscribe();

        let view = SwitcherView {
            visible: true,
            candidates: vec![Candidate::new(CandidateId::new("a"), "A")]
                .into_iter()
                .collect(),
            selected_index: 0,
        };
        surface.render(&view);

        assert_eq!(rx.try_recv().unwrap(), view);
    }

    #[test]
    fn test_late_subscriber_starts_from_last_view() {
        let surface = BroadcastSurface::new(4);
        let (initial, _) = surface.subscribe_with_current();
        assert!(!initial.visible);

        let view = SwitcherView {
            visible: true,
            candidates: CandidateList::new(vec![Candidate::new(CandidateId::new("a"), "A")]),
            selected_index: 0,
        };
        surface.render(&view);

        let (current, mut rx) = surface.subscribe_with_current();
        assert_eq!(current, view);
        assert_eq!(surface.current(), view);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_render_without_subscribers_is_harmless() {
        let surface = BroadcastSurface::new(4);
        surface.render(&SwitcherView::hidden());
    }

    #[test]
    fn test_view_serialization() {
        let json = serde_json::to_string(&SwitcherView::hidden()).unwrap();
        assert_eq!(
            json,
            r#"{"visible":false,"candidates":[],"selected_index":0}"#
        );
    }
}
