//! Error types for the document model

use sitecraft_schema::{BlockId, PageId};
use thiserror::Error;

/// A structural mutation was refused; the snapshot it was applied to is unchanged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Block not found: {block_id} on page {page_id}")]
    BlockNotFound { page_id: PageId, block_id: BlockId },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl DocumentError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        DocumentError::InvariantViolation(message.into())
    }
}
