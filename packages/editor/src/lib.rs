//! # Sitecraft Editor
//!
//! The operation protocol: how proposed edits become document snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ AI provider / user: Changeset of Operations │
//! └─────────────────────────────────────────────┘
//!                     ↓ propose
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - accept / dismiss each operation          │
//! │  - map → schema-validate → gate → apply     │
//! │  - idempotent by operation id               │
//! │  - undo/redo over retained snapshots        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: next immutable snapshot           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sitecraft_editor::{EditSession, GateContext};
//!
//! let mut session = EditSession::new(document);
//! session.propose(changeset)?;
//!
//! let gate = PlanGate::new(&catalog, &usage);
//! let report = session.apply_all(&changeset_id, &GateContext::new(customer, &gate))?;
//! for rejection in &report.rejected {
//!     println!("{}: {}", rejection.operation, rejection.error);
//! }
//! ```

mod errors;
mod history;
mod operations;
mod session;

pub use errors::EditorError;
pub use history::{History, DEFAULT_HISTORY_DEPTH};
pub use operations::{
    Changeset, ChangesetId, Operation, OperationId, OperationKind, OperationState, Preview, TokenUsage,
};
pub use session::{ApplyReport, EditSession, GateContext, Rejection};
