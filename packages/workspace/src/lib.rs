//! # Sitecraft Workspace
//!
//! Everything around the editing core that talks to the outside world:
//! the project store, the customer directory, the AI provider, billing,
//! and the service that ties them together with per-project locking.

pub mod collaborator;
pub mod publish;
pub mod service;
pub mod store;

pub use collaborator::{
    AiProvider, Billing, CollaboratorError, CreditLedger, CustomerDirectory, Hold, Proposal, Reservation,
    StaticDirectory,
};
pub use publish::{build_site, PublishedPage, Site};
pub use service::{ProjectService, ServiceConfig, ServiceError};
pub use store::{FileStore, MemoryStore, ProjectStore, StoreError, PROJECT_FILE_SUFFIX};
