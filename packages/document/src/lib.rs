//! # Sitecraft Document
//!
//! The website document model: a [`Project`] with ordered [`Page`]s, each
//! holding ordered blocks, wrapped in an immutable [`Document`] snapshot.
//!
//! Structural changes go through the primitives on [`Document`]; each one
//! returns a new snapshot and leaves the old one untouched.

mod document;
mod errors;
mod project;

pub use document::{check_invariants, Document};
pub use errors::DocumentError;
pub use project::{is_valid_slug, Page, RESERVED_SLUGS, Project, Seo, SiteSettings};
