//! Selection engine: candidate list plus a cursor into it
//!
//! Pure state, no I/O. Every operation is a synchronous transition that
//! leaves `selected_index` inside the list (or at 0 when the list is
//! empty).

use tracing::{debug, warn};

use crate::candidate::{Candidate, CandidateList};

/// Snapshot handed to rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub list: CandidateList,
    pub selected_index: usize,
}

#[derive(Debug, Default)]
pub struct SelectionEngine {
    list: CandidateList,
    selected_index: usize,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the list and put the cursor back on the sentinel
    pub fn reset(&mut self) {
        self.list = CandidateList::empty();
        self.selected_index = 0;
    }

    /// Replace the list, keeping the cursor on the same candidate when it
    /// survived the refresh
    ///
    /// If the selected identity is gone the cursor stays at its position,
    /// clamped into the new list. Returns whether the snapshot changed.
    pub fn reconcile(&mut self, list: CandidateList) -> bool {
        let followed = self
            .current_selection()
            .and_then(|selected| list.position(&selected.id));

        let index = match followed {
            Some(index) => index,
            None if list.is_empty() => 0,
            None => self.selected_index.min(list.len() - 1),
        };

        let changed = index != self.selected_index || list != self.list;
        if changed {
            debug!(
                from = self.selected_index,
                to = index,
                len = list.len(),
                followed_identity = followed.is_some(),
                "reconciled candidate list"
            );
        }

        self.list = list;
        self.selected_index = index;
        self.check_invariants();
        changed
    }

    pub fn select_next(&mut self) -> bool {
        if self.list.is_empty() {
            debug!("select_next: no candidates available");
            return false;
        }
        self.selected_index = (self.selected_index + 1) % self.list.len();
        self.check_invariants();
        true
    }

    pub fn select_previous(&mut self) -> bool {
        if self.list.is_empty() {
            debug!("select_previous: no candidates available");
            return false;
        }
        self.selected_index = match self.selected_index {
            0 => self.list.len() - 1,
            i => i - 1,
        };
        self.check_invariants();
        true
    }

    /// Move the cursor to an explicit row
    ///
    /// Out-of-range rows (usually a UI acting on a list it rendered before
    /// the last refresh) are clamped to the last row.
    pub fn set_selected_index(&mut self, index: usize) -> bool {
        let clamped = match self.list.len() {
            0 => 0,
            len if index >= len => {
                warn!(index, len, "selection index out of range, clamping");
                len - 1
            }
            _ => index,
        };
        let changed = clamped != self.selected_index;
        self.selected_index = clamped;
        self.check_invariants();
        changed
    }

    pub fn current_selection(&self) -> Option<&Candidate> {
        self.list.get(self.selected_index)
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn snapshot(&self) -> Selection {
        Selection {
            list: self.list.clone(),
            selected_index: self.selected_index,
        }
    }

    fn check_invariants(&self) {
        debug_assert!(
            if self.list.is_empty() {
                self.selected_index == 0
            } else {
                self.selected_index < self.list.len()
            },
            "selection index {} escaped list of length {}",
            self.selected_index,
            self.list.len()
        );
    }
}
