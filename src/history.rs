//! History Manager: linear snapshot-based undo/redo
//!
//! Snapshots hold deep copies of the selections (facet sets, strict flags,
//! numeric constraints). Any new snapshot invalidates the redo chain. The
//! year range is not part of a snapshot and survives undo.

use crate::facet::{FacetState, Selections};
use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// One recorded state.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub selections: Selections,
    /// Name of the action that followed this snapshot, for the UI
    pub label: String,
    pub recorded_at: DateTime<Local>,
}

impl HistoryEntry {
    fn capture(state: &FacetState, label: impl Into<String>) -> Self {
        Self {
            selections: state.selections().clone(),
            label: label.into(),
            recorded_at: Local::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    /// Keep at most this many undo steps, dropping the oldest first
    limit: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.filter(|n| *n > 0),
            ..Self::default()
        }
    }

    /// Push the current state and clear the redo chain.
    pub fn snapshot(&mut self, state: &FacetState) {
        self.record(state, "snapshot");
    }

    pub fn record(&mut self, state: &FacetState, label: impl Into<String>) {
        self.push(state.selections().clone(), label);
    }

    /// Push selections captured earlier, e.g. just before an action that
    /// turned out to change something.
    pub fn push(&mut self, selections: Selections, label: impl Into<String>) {
        self.undo.push_back(HistoryEntry {
            selections,
            label: label.into(),
            recorded_at: Local::now(),
        });
        if let Some(limit) = self.limit {
            while self.undo.len() > limit {
                self.undo.pop_front();
            }
        }
        self.redo.clear();
    }

    /// Restore the previous snapshot. Returns false when there is none.
    pub fn undo(&mut self, state: &mut FacetState) -> bool {
        let Some(entry) = self.undo.pop_back() else {
            return false;
        };
        self.redo.push(HistoryEntry::capture(state, entry.label.clone()));
        state.restore(entry.selections);
        tracing::debug!(action = %entry.label, remaining = self.undo.len(), "undo");
        true
    }

    /// Re-apply the last undone state. Returns false when there is none.
    pub fn redo(&mut self, state: &mut FacetState) -> bool {
        let Some(entry) = self.redo.pop() else {
            return false;
        };
        self.undo.push_back(HistoryEntry::capture(state, entry.label.clone()));
        state.restore(entry.selections);
        tracing::debug!(action = %entry.label, remaining = self.redo.len(), "redo");
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Labels of the undoable steps, most recent first.
    pub fn labels(&self) -> Vec<&str> {
        self.undo.iter().rev().map(|e| e.label.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
