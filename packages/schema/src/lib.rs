//! # Sitecraft Schema
//!
//! The closed set of block types a page can be built from, the field
//! registry each type is validated against, and the theme tokens shared by
//! every page of a project.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ JSON (editor, AI proposal, stored project)  │
//! └─────────────────────────────────────────────┘
//!                     ↓ validate()
//! ┌─────────────────────────────────────────────┐
//! │ schema: BlockType registry → BlockData      │
//! │  - unknown types / fields rejected          │
//! │  - required fields enforced                 │
//! │  - length, url and enum rules               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: typed Block inside a Page         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! A [`Block`] can only be constructed from data that passed validation,
//! including when it is deserialised from a stored project.

mod block;
mod defaults;
mod id_generator;
mod ids;
mod registry;
pub mod theme;
mod validate;

pub use block::*;
pub use defaults::{create_default, default_data};
pub use id_generator::{get_seed, IdGenerator};
pub use ids::{BlockId, CustomerId, PageId, ProjectId};
pub use registry::{schema_for, BlockSchema, FieldRule, FieldSpec};
pub use theme::{apply_theme, ColorToken, FontToken, ResolvedTheme, SpacingScale, Theme, ThemeOverrides};
pub use validate::{is_identifier, is_well_formed_url, validate, validate_kind, SchemaError};
