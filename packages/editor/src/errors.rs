//! Error types for the editor

use crate::operations::{ChangesetId, OperationId, OperationState};
use sitecraft_document::DocumentError;
use sitecraft_plans::{Denial, GateError};
use sitecraft_schema::{ProjectId, SchemaError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Plan check failed: {0}")]
    Gate(#[from] GateError),

    #[error("Not allowed by plan: {0}")]
    PlanDenied(Denial),

    #[error("Operation {operation} cannot go from {from} to {to}")]
    InvalidTransition {
        operation: OperationId,
        from: OperationState,
        to: OperationState,
    },

    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),

    #[error("Unknown changeset: {0}")]
    UnknownChangeset(ChangesetId),

    #[error("Operation {0} was already proposed")]
    DuplicateOperation(OperationId),

    #[error("Changeset {0} was already proposed")]
    DuplicateChangeset(ChangesetId),

    #[error("Changeset targets project {found}, session edits {expected}")]
    WrongProject { expected: ProjectId, found: ProjectId },
}
