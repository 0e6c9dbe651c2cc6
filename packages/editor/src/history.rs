//! # Snapshot History
//!
//! Undo/redo over retained document snapshots.
//!
//! ## Design
//!
//! - Before a change is committed, the snapshot it replaces is recorded
//! - Undo hands back the most recent recorded snapshot and keeps the
//!   current one for redo
//! - New changes clear the redo stack
//! - A batch (one `apply_all`) records only the snapshot it started from,
//!   so the whole batch is undone as one step

use sitecraft_document::Document;
use std::collections::VecDeque;

/// Default number of undo levels
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

#[derive(Debug, Clone)]
struct HistoryEntry {
    snapshot: Document,
    description: Option<String>,
}

/// Bounded undo/redo stacks of snapshots
#[derive(Debug, Clone)]
pub struct History {
    /// Oldest first
    undo_stack: VecDeque<HistoryEntry>,

    /// Most recently undone last
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Open batch and the snapshot it started from, once known
    batch: Option<Option<HistoryEntry>>,

    batch_description: Option<String>,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels,
            batch: None,
            batch_description: None,
        }
    }

    /// Record `previous` as the state a new change is leaving behind
    pub fn record(&mut self, previous: Document, description: Option<String>) {
        match &mut self.batch {
            Some(started) => {
                if started.is_none() {
                    *started = Some(HistoryEntry {
                        snapshot: previous,
                        description: None,
                    });
                }
            }
            None => self.push(HistoryEntry {
                snapshot: previous,
                description,
            }),
        }
    }

    /// Group the following records into one undo step
    pub fn begin_batch(&mut self, description: impl Into<String>) {
        self.batch = Some(None);
        self.batch_description = Some(description.into());
    }

    pub fn end_batch(&mut self) {
        let description = self.batch_description.take();
        if let Some(Some(mut entry)) = self.batch.take() {
            entry.description = description;
            self.push(entry);
        }
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }

        self.redo_stack.clear();
    }

    /// Snapshot to go back to; `current` is kept for redo
    pub fn undo(&mut self, current: Document) -> Option<Document> {
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack.push(HistoryEntry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Some(entry.snapshot)
    }

    /// Snapshot to go forward to; `current` is kept for undo
    pub fn redo(&mut self, current: Document) -> Option<Document> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push_back(HistoryEntry {
            snapshot: current,
            description: entry.description.clone(),
        });
        Some(entry.snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
        self.batch_description = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().and_then(|e| e.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|e| e.description.as_deref())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
