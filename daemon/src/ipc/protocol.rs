//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::SwitcherEvent;
use crate::presentation::{Gesture, SwitcherView};

/// Largest frame either side accepts
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Subscribe to view and event notifications
    Subscribe,

    /// Open the switcher without a held modifier
    Show,

    /// Close the switcher without activating
    Hide,

    SelectNext,

    SelectPrevious,

    /// Pointer hover / click on a row
    SetSelectedIndex { index: usize },

    /// Activate a row (or the current selection) and close
    Commit {
        #[serde(default)]
        index: Option<usize>,
    },

    /// Escape / dismiss
    Cancel,
}

impl Request {
    /// The controller gesture this request forwards, if any
    pub fn gesture(&self) -> Option<Gesture> {
        match self {
            Request::Ping | Request::GetStatus | Request::Subscribe => None,
            Request::Show => Some(Gesture::Show),
            Request::Hide => Some(Gesture::Hide),
            Request::SelectNext => Some(Gesture::SelectNext),
            Request::SelectPrevious => Some(Gesture::SelectPrevious),
            Request::SetSelectedIndex { index } => Some(Gesture::SetSelectedIndex(*index)),
            Request::Commit { index } => Some(Gesture::Commit(*index)),
            Request::Cancel => Some(Gesture::Cancel),
        }
    }
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Gesture queued for the controller
    Accepted,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Switcher contents or visibility changed
    View { view: SwitcherView },
    /// Lifecycle or diagnostic event occurred
    Event { event: SwitcherEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Switcher is on screen
    pub visible: bool,

    /// Candidates in the last pushed view
    pub candidates: usize,

    /// Selected row in the last pushed view
    pub selected_index: usize,

    /// Trigger chord, e.g. "option+tab"
    pub chord: String,

    /// Whether the global hook is installed
    pub hotkey_registered: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            visible: false,
            candidates: 0,
            selected_index: 0,
            chord: String::new(),
            hotkey_registered: false,
            uptime_secs: 0,
        }
    }
}

impl DaemonStatus {
    pub fn apply_view(&mut self, view: &SwitcherView) {
        self.visible = view.visible;
        self.candidates = view.candidates.len();
        self.selected_index = view.selected_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetSelectedIndex { index: 3 };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_selected_index"));
        assert!(json.contains("3"));
    }

    #[test]
    fn test_commit_index_is_optional() {
        let req: Request = serde_json::from_str(r#"{"type":"commit"}"#).unwrap();
        assert_eq!(req, Request::Commit { index: None });
        assert_eq!(req.gesture(), Some(Gesture::Commit(None)));

        let req: Request = serde_json::from_str(r#"{"type":"commit","index":2}"#).unwrap();
        assert_eq!(req.gesture(), Some(Gesture::Commit(Some(2))));
    }

    #[test]
    fn test_queries_are_not_gestures() {
        assert_eq!(Request::Ping.gesture(), None);
        assert_eq!(Request::GetStatus.gesture(), None);
        assert_eq!(Request::Subscribe.gesture(), None);
        assert_eq!(Request::Cancel.gesture(), Some(Gesture::Cancel));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("hotkey_registered"));
    }

    #[test]
    fn test_notification_serialization() {
        let note = Notification::Event {
            event: SwitcherEvent::Cancelled { duration_ms: 12 },
        };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"type":"event","event":{"type":"cancelled","duration_ms":12}}"#
        );
    }
}
