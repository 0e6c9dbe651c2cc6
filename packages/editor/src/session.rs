//! # Edit Session
//!
//! Holds the latest snapshot of one project and the lifecycle of every
//! operation proposed against it.
//!
//! An operation is applied at most once. Accepting it again hands back the
//! snapshot its first application produced.
//!
//! Settled changesets are kept for as many levels as the undo history. Once
//! more are registered, the oldest changesets whose operations are all
//! terminal are forgotten along with the snapshots they pinned.

use crate::history::{History, DEFAULT_HISTORY_DEPTH};
use crate::operations::{Changeset, ChangesetId, Operation, OperationId, OperationState, Step, TokenUsage};
use crate::EditorError;
use sitecraft_document::Document;
use sitecraft_plans::{Decision, Feature, Gate};
use sitecraft_schema::CustomerId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Who is editing, and the gate their changes are checked against
pub struct GateContext<'a> {
    pub customer: CustomerId,
    pub gate: &'a dyn Gate,
}

impl<'a> GateContext<'a> {
    pub fn new(customer: impl Into<CustomerId>, gate: &'a dyn Gate) -> Self {
        Self {
            customer: customer.into(),
            gate,
        }
    }
}

/// A registered operation and where it is in its lifecycle
#[derive(Debug, Clone)]
struct Entry {
    operation: Operation,
    state: OperationState,

    /// Set once the operation reaches Applied or Rejected
    outcome: Option<Result<Document, EditorError>>,
}

#[derive(Debug, Clone)]
struct ChangesetEntry {
    operations: Vec<OperationId>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub operation: OperationId,
    pub error: EditorError,
}

/// Outcome of [`EditSession::apply_all`]
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub changeset: ChangesetId,
    pub applied: Vec<OperationId>,
    pub rejected: Vec<Rejection>,
    pub skipped: Vec<OperationId>,

    /// Snapshot after the last applied operation
    pub document: Document,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    document: Document,
    entries: HashMap<OperationId, Entry>,
    changesets: HashMap<ChangesetId, ChangesetEntry>,

    /// Registration order, oldest first
    order: VecDeque<ChangesetId>,
    retained_changesets: usize,
    history: History,
}

impl EditSession {
    pub fn new(document: Document) -> Self {
        Self::with_history(document, History::new(), DEFAULT_HISTORY_DEPTH)
    }

    /// Session keeping at most `depth` undo levels
    pub fn with_history_depth(document: Document, depth: usize) -> Self {
        Self::with_history(document, History::with_max_levels(depth), depth)
    }

    fn with_history(document: Document, history: History, retained_changesets: usize) -> Self {
        Self {
            document,
            entries: HashMap::new(),
            changesets: HashMap::new(),
            order: VecDeque::new(),
            retained_changesets: retained_changesets.max(1),
            history,
        }
    }

    /// Latest snapshot
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self, op_id: &OperationId) -> Option<OperationState> {
        self.entries.get(op_id).map(|e| e.state)
    }

    pub fn operation(&self, op_id: &OperationId) -> Option<&Operation> {
        self.entries.get(op_id).map(|e| &e.operation)
    }

    /// Why a rejected operation was rejected
    pub fn rejection(&self, op_id: &OperationId) -> Option<EditorError> {
        match &self.entries.get(op_id)?.outcome {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Operation ids of a changeset, in proposal order
    pub fn changeset_operations(&self, changeset_id: &ChangesetId) -> Option<&[OperationId]> {
        self.changesets.get(changeset_id).map(|c| c.operations.as_slice())
    }

    pub fn usage(&self, changeset_id: &ChangesetId) -> Option<TokenUsage> {
        self.changesets.get(changeset_id).and_then(|c| c.usage)
    }

    /// Register every operation of `changeset` as Proposed.
    ///
    /// Nothing is registered if any operation id is already known.
    pub fn propose(&mut self, changeset: Changeset) -> Result<(), EditorError> {
        let project_id = &self.document.project().id;
        if &changeset.project_id != project_id {
            return Err(EditorError::WrongProject {
                expected: project_id.clone(),
                found: changeset.project_id,
            });
        }

        if self.changesets.contains_key(&changeset.id) {
            return Err(EditorError::DuplicateChangeset(changeset.id));
        }

        let mut seen = HashSet::new();
        for op in &changeset.operations {
            if self.entries.contains_key(&op.id) || !seen.insert(&op.id) {
                return Err(EditorError::DuplicateOperation(op.id.clone()));
            }
        }

        let ids = changeset.operations.iter().map(|op| op.id.clone()).collect();
        for operation in changeset.operations {
            tracing::debug!(operation = %operation.id, kind = operation.kind.type_name(), "operation proposed");
            self.entries.insert(
                operation.id.clone(),
                Entry {
                    operation,
                    state: OperationState::Proposed,
                    outcome: None,
                },
            );
        }

        self.order.push_back(changeset.id.clone());
        self.changesets.insert(
            changeset.id,
            ChangesetEntry {
                operations: ids,
                usage: changeset.usage,
            },
        );
        self.prune();
        Ok(())
    }

    /// Forget the oldest settled changesets beyond the retention limit.
    /// A changeset with an operation still Proposed or Accepted is kept.
    fn prune(&mut self) {
        let mut excess = self.order.len().saturating_sub(self.retained_changesets);
        let mut index = 0;

        while excess > 0 && index < self.order.len() {
            let settled = self.changesets.get(&self.order[index]).map_or(true, |cs| {
                cs.operations
                    .iter()
                    .all(|id| self.entries.get(id).map_or(true, |e| e.state.is_terminal()))
            });

            if !settled {
                index += 1;
                continue;
            }

            let Some(changeset_id) = self.order.remove(index) else {
                break;
            };
            if let Some(changeset) = self.changesets.remove(&changeset_id) {
                for op_id in &changeset.operations {
                    self.entries.remove(op_id);
                }
            }
            tracing::debug!(changeset = %changeset_id, "settled changeset released");
            excess -= 1;
        }
    }

    /// Accept an operation and apply it.
    ///
    /// On success the operation is Applied and the new snapshot returned.
    /// On failure it is Rejected and the snapshot stays as it was.
    pub fn accept(&mut self, op_id: &OperationId, ctx: &GateContext<'_>) -> Result<Document, EditorError> {
        let entry = self
            .entries
            .get_mut(op_id)
            .ok_or_else(|| EditorError::UnknownOperation(op_id.clone()))?;

        match (entry.state, &entry.outcome) {
            (OperationState::Applied, Some(Ok(snapshot))) => {
                tracing::debug!(operation = %op_id, "operation already applied");
                return Ok(snapshot.clone());
            }
            (OperationState::Proposed, _) => {}
            (from, _) => {
                return Err(EditorError::InvalidTransition {
                    operation: op_id.clone(),
                    from,
                    to: OperationState::Accepted,
                });
            }
        }

        entry.state = OperationState::Accepted;
        tracing::debug!(operation = %op_id, "operation accepted");

        let operation = entry.operation.clone();
        let result = self.execute(&operation, ctx);

        match &result {
            Ok(next) => {
                let previous = std::mem::replace(&mut self.document, next.clone());
                let description = Some(operation.description.clone()).filter(|d| !d.is_empty());
                self.history.record(previous, description);
                tracing::info!(
                    operation = %op_id,
                    kind = operation.kind.type_name(),
                    version = next.version(),
                    "operation applied"
                );
            }
            Err(error) => {
                tracing::warn!(operation = %op_id, kind = operation.kind.type_name(), %error, "operation rejected");
            }
        }

        if let Some(entry) = self.entries.get_mut(op_id) {
            entry.state = if result.is_ok() {
                OperationState::Applied
            } else {
                OperationState::Rejected
            };
            entry.outcome = Some(result.clone());
        }

        result
    }

    /// Map, validate, gate, apply
    fn execute(&self, operation: &Operation, ctx: &GateContext<'_>) -> Result<Document, EditorError> {
        let step: Step = operation.kind.prepare(&self.document)?;

        if let Some(feature) = step.gated_type().and_then(|kind| kind.required_feature()) {
            let feature: Feature = feature.parse()?;
            if let Decision::Denied(denial) = ctx.gate.check_feature_gate(&ctx.customer, feature)? {
                return Err(EditorError::PlanDenied(denial));
            }
        }

        Ok(step.apply(&self.document)?)
    }

    /// Proposed → Dismissed. The document is not touched.
    pub fn dismiss(&mut self, op_id: &OperationId) -> Result<(), EditorError> {
        let entry = self
            .entries
            .get_mut(op_id)
            .ok_or_else(|| EditorError::UnknownOperation(op_id.clone()))?;

        if entry.state != OperationState::Proposed {
            return Err(EditorError::InvalidTransition {
                operation: op_id.clone(),
                from: entry.state,
                to: OperationState::Dismissed,
            });
        }

        entry.state = OperationState::Dismissed;
        tracing::debug!(operation = %op_id, "operation dismissed");
        Ok(())
    }

    /// Accept every operation of a changeset in proposal order.
    ///
    /// Each operation is atomic on its own: a rejection leaves the ones
    /// applied before it in place. Dismissed operations are skipped.
    pub fn apply_all(
        &mut self,
        changeset_id: &ChangesetId,
        ctx: &GateContext<'_>,
    ) -> Result<ApplyReport, EditorError> {
        let ids = self
            .changesets
            .get(changeset_id)
            .map(|c| c.operations.clone())
            .ok_or_else(|| EditorError::UnknownChangeset(changeset_id.clone()))?;

        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        let mut skipped = Vec::new();

        self.history.begin_batch(format!("changeset {changeset_id}"));

        for op_id in ids {
            let Some(state) = self.state(&op_id) else {
                continue;
            };

            match state {
                OperationState::Dismissed | OperationState::Accepted => skipped.push(op_id),
                OperationState::Applied => applied.push(op_id),
                OperationState::Rejected => {
                    if let Some(error) = self.rejection(&op_id) {
                        rejected.push(Rejection { operation: op_id, error });
                    }
                }
                OperationState::Proposed => match self.accept(&op_id, ctx) {
                    Ok(_) => applied.push(op_id),
                    Err(error) => rejected.push(Rejection { operation: op_id, error }),
                },
            }
        }

        self.history.end_batch();

        tracing::info!(
            changeset = %changeset_id,
            applied = applied.len(),
            rejected = rejected.len(),
            skipped = skipped.len(),
            "changeset processed"
        );

        Ok(ApplyReport {
            changeset: changeset_id.clone(),
            applied,
            rejected,
            skipped,
            document: self.document.clone(),
        })
    }

    /// Make `next` the latest snapshot outside the operation protocol,
    /// e.g. for page management
    pub fn commit(&mut self, next: Document, description: impl Into<String>) {
        let previous = std::mem::replace(&mut self.document, next);
        self.history.record(previous, Some(description.into()));
    }

    /// Step back one history level; `Ok(None)` when there is nothing to undo
    pub fn undo(&mut self) -> Result<Option<Document>, EditorError> {
        let Some(earlier) = self.history.undo(self.document.clone()) else {
            return Ok(None);
        };
        self.document = self.document.restore(&earlier)?;
        Ok(Some(self.document.clone()))
    }

    pub fn redo(&mut self) -> Result<Option<Document>, EditorError> {
        let Some(later) = self.history.redo(self.document.clone()) else {
            return Ok(None);
        };
        self.document = self.document.restore(&later)?;
        Ok(Some(self.document.clone()))
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}
