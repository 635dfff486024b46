//! Running applications via NSWorkspace

use objc2::rc::autoreleasepool;
use objc2_app_kit::{
    NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
    NSWorkspace,
};
use objc2_foundation::NSString;
use tracing::{debug, trace};

use crate::candidate::{
    ActivateError, Activator, Candidate, CandidateId, CandidateList, CandidateSource, SourceError,
};

/// Lists regular (Dock-visible) applications, excluding the daemon itself
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSource {
    excluded: Vec<String>,
}

impl WorkspaceSource {
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }

    fn is_excluded(&self, bundle_id: Option<&str>) -> bool {
        bundle_id.is_some_and(|id| self.excluded.iter().any(|e| e == id))
    }
}

impl CandidateSource for WorkspaceSource {
    fn list(&self) -> Result<CandidateList, SourceError> {
        // Runs on blocking-pool threads that never drain an outer pool
        autoreleasepool(|_| {
            let own_pid = std::process::id() as i32;
            let workspace = unsafe { NSWorkspace::sharedWorkspace() };
            let running = unsafe { workspace.runningApplications() };

            let mut candidates = Vec::new();
            for app in running.iter() {
                if unsafe { app.activationPolicy() } != NSApplicationActivationPolicy::Regular {
                    continue;
                }
                let pid = unsafe { app.processIdentifier() };
                if pid == own_pid {
                    continue;
                }

                let bundle_id = unsafe { app.bundleIdentifier() }.map(|id| id.to_string());
                if self.is_excluded(bundle_id.as_deref()) {
                    trace!(?bundle_id, "skipping excluded application");
                    continue;
                }

                let name = unsafe { app.localizedName() }
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| "Unknown".to_string());

                let candidate = match bundle_id {
                    Some(bundle_id) => Candidate::new(CandidateId::new(bundle_id.clone()), name)
                        .with_subtitle(bundle_id.clone())
                        .with_icon(bundle_id),
                    None => Candidate::new(CandidateId::for_pid(pid), name),
                };
                candidates.push(candidate.with_pid(pid));
            }

            debug!(count = candidates.len(), "listed running applications");
            Ok(CandidateList::new(candidates))
        })
    }
}

/// Brings a running application to the front
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceActivator;

impl WorkspaceActivator {
    pub fn new() -> Self {
        Self
    }
}

impl Activator for WorkspaceActivator {
    fn activate(&self, candidate: &Candidate) -> Result<(), ActivateError> {
        autoreleasepool(|_| {
            let by_pid = candidate.pid.and_then(|pid| unsafe {
                NSRunningApplication::runningApplicationWithProcessIdentifier(pid)
            });
            let app = match by_pid {
                Some(app) => app,
                None => {
                    let bundle_id = NSString::from_str(candidate.id.as_str());
                    let matches = unsafe {
                        NSRunningApplication::runningApplicationsWithBundleIdentifier(&bundle_id)
                    };
                    let first = matches.iter().next();
                    first.ok_or_else(|| ActivateError::NotRunning(candidate.id.clone()))?
                }
            };

            if unsafe { app.isTerminated() } {
                return Err(ActivateError::NotRunning(candidate.id.clone()));
            }
            if unsafe { app.isHidden() } {
                debug!(id = %candidate.id, "unhiding application");
                unsafe { app.unhide() };
            }

            if unsafe { app.activateWithOptions(NSApplicationActivationOptions::ActivateAllWindows) }
            {
                Ok(())
            } else {
                Err(ActivateError::Refused(candidate.id.clone()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion() {
        let source = WorkspaceSource::new(vec!["com.example.daemon".to_string()]);
        assert!(source.is_excluded(Some("com.example.daemon")));
        assert!(!source.is_excluded(Some("com.apple.Safari")));
        assert!(!source.is_excluded(None));
    }

    #[test]
    fn test_repeated_listing_skips_own_process() {
        let source = WorkspaceSource::default();
        let own_pid = std::process::id() as i32;
        for _ in 0..3 {
            let list = source.list().unwrap();
            assert!(list.iter().all(|c| c.pid != Some(own_pid)));
        }
    }

    #[test]
    fn test_activating_unknown_bundle_reports_not_running() {
        let candidate = Candidate::new(CandidateId::new("com.example.not-installed"), "Ghost");
        assert!(matches!(
            WorkspaceActivator::new().activate(&candidate),
            Err(ActivateError::NotRunning(_))
        ));
    }
}
