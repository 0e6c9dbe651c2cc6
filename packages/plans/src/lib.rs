//! # Sitecraft Plans
//!
//! Subscription limits and the gate that enforces them.
//!
//! The gate never mutates anything: it answers `Allowed` or `Denied` from
//! the plan catalog and a usage source that the caller fetched for this
//! one decision.

mod errors;
mod gate;
mod plan;

pub use errors::GateError;
pub use gate::{resolve_settings, Decision, Denial, Gate, PlanGate, UsageSnapshot, UsageSource};
pub use plan::{Feature, PlanCatalog, PlanLimits, PlanTier};
