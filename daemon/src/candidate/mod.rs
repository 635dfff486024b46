//! Candidate records and the collaborator contracts around them
//!
//! A candidate is one selectable entry in the switcher (a running
//! application). The daemon never looks inside the display fields; the
//! only thing the selection logic cares about is the identity key.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Stable key for a candidate, unique within one listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity for a process that has no bundle identifier
    pub fn for_pid(pid: i32) -> Self {
        Self(format!("pid:{pid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One selectable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Opaque handle the UI resolves to an icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
}

impl Candidate {
    pub fn new(id: CandidateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subtitle: None,
            icon: None,
            pid: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }
}

/// Immutable, ordered snapshot of candidates
///
/// Cloning is cheap (shared storage). A refresh replaces the whole list;
/// nothing ever mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList(Arc<[Candidate]>);

impl CandidateList {
    /// Build a snapshot, collapsing repeated identities (first one wins)
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut unique = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if seen.insert(candidate.id.clone()) {
                unique.push(candidate);
            } else {
                debug!(id = %candidate.id, "dropping duplicate candidate identity");
            }
        }
        Self(unique.into())
    }

    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.0.get(index)
    }

    pub fn position(&self, id: &CandidateId) -> Option<usize> {
        self.0.iter().position(|c| &c.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.0.iter()
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<Candidate> for CandidateList {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Serialize for CandidateList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for CandidateList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Candidate>::deserialize(deserializer).map(Self::new)
    }
}

/// Supplies the current candidates on demand
///
/// Every call returns a fresh snapshot. Implementations must be cheap
/// enough to call every few seconds and safe to call from any thread.
pub trait CandidateSource: Send + Sync {
    fn list(&self) -> Result<CandidateList, SourceError>;
}

/// Performs the real-world action for a committed candidate
pub trait Activator: Send + Sync {
    fn activate(&self, candidate: &Candidate) -> Result<(), ActivateError>;
}

/// Errors from enumerating candidates
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("candidate enumeration is not supported on this platform")]
    Unsupported,

    #[error("candidate enumeration failed: {0}")]
    Enumeration(String),

    #[error("candidate enumeration task failed: {0}")]
    Task(String),
}

/// Errors from activating a candidate
#[derive(Debug, thiserror::Error)]
pub enum ActivateError {
    #[error("application {0} is no longer running")]
    NotRunning(CandidateId),

    #[error("activation of {0} was refused")]
    Refused(CandidateId),

    #[error("activation is not supported on this platform")]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> Candidate {
        Candidate::new(CandidateId::new(id), id.to_uppercase())
    }

    #[test]
    fn test_duplicate_identities_collapse() {
        let list = CandidateList::new(vec![
            candidate("a"),
            candidate("b"),
            Candidate::new(CandidateId::new("a"), "Second A"),
        ]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0).unwrap().name, "A");
        assert_eq!(list.position(&CandidateId::new("b")), Some(1));
    }

    #[test]
    fn test_pid_identity() {
        assert_eq!(CandidateId::for_pid(42).as_str(), "pid:42");
    }

    #[test]
    fn test_list_serializes_as_array() {
        let list: CandidateList = vec![candidate("com.example.a").with_pid(7)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("com.example.a"));
        assert!(!json.contains("subtitle"));

        let back: CandidateList = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
    }
}
