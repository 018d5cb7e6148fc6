//! Clue unlock state for one console context.
//!
//! Three flags advance in order: cipher decoded, command repaired, evidence
//! accessed. Flags only ever go from false to true; there is no rollback and
//! nothing is persisted. A fresh tracker starts with every flag clear.

use std::sync::{Mutex, MutexGuard};

/// Ordered view of the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    None,
    Clue1,
    Clue2,
    Solved,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub clue1: bool,
    pub clue2: bool,
    pub clue3: bool,
}

impl ProgressState {
    /// Longest satisfied prefix of the unlock order.
    pub fn stage(&self) -> Stage {
        match (self.clue1, self.clue2, self.clue3) {
            (true, true, true) => Stage::Solved,
            (true, true, false) => Stage::Clue2,
            (true, false, _) => Stage::Clue1,
            _ => Stage::None,
        }
    }

    /// Raw count of set flags, as shown on the status screen.
    pub fn clues_found(&self) -> u32 {
        [self.clue1, self.clue2, self.clue3]
            .iter()
            .filter(|f| **f)
            .count() as u32
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere cannot leave three bools half-written
    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ProgressState {
        *self.lock()
    }

    pub fn stage(&self) -> Stage {
        self.snapshot().stage()
    }

    pub fn clues_found(&self) -> u32 {
        self.snapshot().clues_found()
    }

    pub fn cipher_decoded(&self) -> bool {
        self.lock().clue1
    }

    pub fn command_repaired(&self) -> bool {
        self.lock().clue2
    }

    pub fn record_cipher(&self) {
        self.lock().clue1 = true;
    }

    /// Set `clue2` if `clue1` is already set. Returns whether the gate held.
    pub fn record_repair(&self) -> bool {
        let mut state = self.lock();
        if !state.clue1 {
            return false;
        }
        state.clue2 = true;
        true
    }

    pub fn record_evidence(&self) {
        self.lock().clue3 = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let t = ProgressTracker::new();
        assert_eq!(t.stage(), Stage::None);
        assert_eq!(t.clues_found(), 0);
    }

    #[test]
    fn repair_requires_cipher() {
        let t = ProgressTracker::new();
        assert!(!t.record_repair());
        assert_eq!(t.snapshot(), ProgressState::default());
        t.record_cipher();
        assert!(t.record_repair());
        assert_eq!(t.stage(), Stage::Clue2);
    }

    #[test]
    fn marks_are_idempotent() {
        let t = ProgressTracker::new();
        t.record_cipher();
        t.record_cipher();
        assert_eq!(t.clues_found(), 1);
        assert_eq!(t.stage(), Stage::Clue1);
    }

    #[test]
    fn stage_is_prefix_but_count_is_raw() {
        let t = ProgressTracker::new();
        t.record_evidence();
        assert_eq!(t.stage(), Stage::None);
        assert_eq!(t.clues_found(), 1);
        t.record_cipher();
        assert!(t.record_repair());
        assert_eq!(t.stage(), Stage::Solved);
        assert!(Stage::Solved > Stage::Clue2);
    }
}
