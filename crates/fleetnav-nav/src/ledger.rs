//! Per-agent record of already-reported obstacles.

use std::collections::HashSet;

use fleetnav_types::BodyId;

/// Tracks which obstacle instances this agent has reported.
///
/// An obstacle is reportable at most once while it is held here.  Task
/// routines may [`reset`](ObstacleLedger::reset) the ledger when they finish
/// so a relocated obstacle can be evaluated again.
#[derive(Debug, Clone, Default)]
pub struct ObstacleLedger {
    reported: HashSet<BodyId>,
}

impl ObstacleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_report(&self, obstacle: BodyId) -> bool {
        !self.reported.contains(&obstacle)
    }

    pub fn mark_reported(&mut self, obstacle: BodyId) {
        self.reported.insert(obstacle);
    }

    /// Check and mark in one step. Returns `true` the first time only.
    pub fn claim(&mut self, obstacle: BodyId) -> bool {
        self.reported.insert(obstacle)
    }

    pub fn reset(&mut self) {
        self.reported.clear();
    }

    pub fn len(&self) -> usize {
        self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}
