//! Error types for plan checks

use sitecraft_schema::{CustomerId, ProjectId};
use thiserror::Error;

/// The gate could not reach a decision.
///
/// A denial is not an error; see [`crate::Decision`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("No usage recorded for customer {0}")]
    UnknownCustomer(CustomerId),

    #[error("No usage recorded for project {0}")]
    UnknownProject(ProjectId),
}
