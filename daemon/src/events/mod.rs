//! Events module for switcher lifecycle and diagnostics
//!
//! The controller broadcasts one of these on every visibility change and
//! whenever a collaborator misbehaves. Subscribed IPC clients receive
//! them verbatim.

use serde::{Deserialize, Serialize};

use crate::candidate::CandidateId;

/// Events emitted by the interaction controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwitcherEvent {
    /// Switcher became visible
    Shown {
        /// Number of candidates in the initial listing
        candidates: usize,
        /// Session was opened without a held modifier
        pinned: bool,
    },

    /// Selection moved while visible
    SelectionMoved { index: usize },

    /// A candidate was handed to the activator and the switcher closed
    Committed {
        id: CandidateId,
        /// Milliseconds the switcher was visible
        duration_ms: u64,
    },

    /// Switcher closed without activating anything
    Cancelled { duration_ms: u64 },

    /// Candidate source failed; the interaction continues
    SourceFailed { message: String },

    /// Activator failed; the switcher still closes
    ActivationFailed { id: CandidateId, message: String },

    /// A background listing arrived after its session ended
    StaleResultDropped { generation: u64 },
}

impl std::fmt::Display for SwitcherEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitcherEvent::Shown { candidates, pinned } => {
                write!(f, "SHOWN ({} candidates", candidates)?;
                if *pinned {
                    write!(f, ", pinned")?;
                }
                write!(f, ")")
            }
            SwitcherEvent::SelectionMoved { index } => write!(f, "SELECTION_MOVED ({})", index),
            SwitcherEvent::Committed { id, duration_ms } => {
                write!(f, "COMMITTED {} ({}ms)", id, duration_ms)
            }
            SwitcherEvent::Cancelled { duration_ms } => write!(f, "CANCELLED ({}ms)", duration_ms),
            SwitcherEvent::SourceFailed { message } => write!(f, "SOURCE_FAILED: {}", message),
            SwitcherEvent::ActivationFailed { id, message } => {
                write!(f, "ACTIVATION_FAILED {}: {}", id, message)
            }
            SwitcherEvent::StaleResultDropped { generation } => {
                write!(f, "STALE_RESULT_DROPPED (generation {})", generation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SwitcherEvent::Committed {
            id: CandidateId::new("com.apple.Safari"),
            duration_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"committed\""));
        assert!(json.contains("com.apple.Safari"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"stale_result_dropped","generation":4}"#;
        let event: SwitcherEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, SwitcherEvent::StaleResultDropped { generation: 4 });
    }

    #[test]
    fn test_display() {
        let event = SwitcherEvent::Shown {
            candidates: 3,
            pinned: true,
        };
        assert_eq!(event.to_string(), "SHOWN (3 candidates, pinned)");
    }
}
