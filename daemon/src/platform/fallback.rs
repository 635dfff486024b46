//! Inert collaborators for platforms without an application switcher API

use tracing::debug;

use crate::candidate::{
    ActivateError, Activator, Candidate, CandidateList, CandidateSource, SourceError,
};

#[derive(Debug, Clone, Default)]
pub struct WorkspaceSource {
    excluded: Vec<String>,
}

impl WorkspaceSource {
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }
}

impl CandidateSource for WorkspaceSource {
    fn list(&self) -> Result<CandidateList, SourceError> {
        debug!(excluded = self.excluded.len(), "no application listing on this platform");
        Err(SourceError::Unsupported)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceActivator;

impl WorkspaceActivator {
    pub fn new() -> Self {
        Self
    }
}

impl Activator for WorkspaceActivator {
    fn activate(&self, candidate: &Candidate) -> Result<(), ActivateError> {
        debug!(id = %candidate.id, "no activation on this platform");
        Err(ActivateError::Unsupported)
    }
}
