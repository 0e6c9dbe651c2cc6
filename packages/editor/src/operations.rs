//! # Operations
//!
//! Proposed edits to one project, usually produced by the AI provider.
//!
//! ## Lifecycle
//!
//! ```text
//! Proposed ──accept──→ Accepted ──→ Applied
//!     │                    └──────→ Rejected
//!     └────dismiss──→ Dismissed
//! ```
//!
//! Applied, Rejected and Dismissed are terminal.
//!
//! ## Wire form
//!
//! ```json
//! {
//!   "id": "op-1",
//!   "createdAt": "2024-05-01T12:00:00Z",
//!   "type": "update_block",
//!   "description": "Shorten the headline",
//!   "payload": { "pageId": "home", "blockId": "a1-1", "data": { "headline": "Hi" } },
//!   "preview": { "label": "Hero", "before": "Hello there", "after": "Hi" }
//! }
//! ```

use crate::errors::EditorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sitecraft_document::{Document, DocumentError, Seo};
use sitecraft_schema::{
    default_data, validate_kind, Block, BlockData, BlockId, BlockStyle, BlockType, PageId, ProjectId,
    SchemaError, Theme,
};
use std::fmt;

sitecraft_schema::define_id!(
    /// Identifier of a proposed operation
    OperationId
);
sitecraft_schema::define_id!(
    /// Identifier of a batch of operations proposed together
    ChangesetId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Proposed,
    Accepted,
    Dismissed,
    Applied,
    Rejected,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Dismissed | OperationState::Applied | OperationState::Rejected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::Proposed => "proposed",
            OperationState::Accepted => "accepted",
            OperationState::Dismissed => "dismissed",
            OperationState::Applied => "applied",
            OperationState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-facing summary of an operation; never interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
}

/// What an operation does, tagged by `type` with its `payload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OperationKind {
    /// Add a block. `data` is overlaid on the type's placeholder data.
    #[serde(rename_all = "camelCase")]
    AddBlock {
        page_id: PageId,
        block_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<BlockStyle>,
        /// Position on the page; appended when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// Overlay `data` fields on an existing block; `style` replaces
    #[serde(rename_all = "camelCase")]
    UpdateBlock {
        page_id: PageId,
        block_id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<BlockStyle>,
    },

    #[serde(rename_all = "camelCase")]
    RemoveBlock { page_id: PageId, block_id: BlockId },

    UpdateTheme { theme: Theme },

    /// Page SEO, or site SEO when `pageId` is absent
    #[serde(rename_all = "camelCase")]
    UpdateSeo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page_id: Option<PageId>,
        seo: Seo,
    },
}

impl OperationKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationKind::AddBlock { .. } => "add_block",
            OperationKind::UpdateBlock { .. } => "update_block",
            OperationKind::RemoveBlock { .. } => "remove_block",
            OperationKind::UpdateTheme { .. } => "update_theme",
            OperationKind::UpdateSeo { .. } => "update_seo",
        }
    }

    /// Resolve against the current snapshot into a schema-checked step.
    ///
    /// Nothing is applied here; the caller gates the step first.
    pub(crate) fn prepare(&self, doc: &Document) -> Result<Step, EditorError> {
        match self {
            OperationKind::AddBlock {
                page_id,
                block_type,
                data,
                style,
                index,
            } => {
                let kind: BlockType = block_type.parse()?;
                let base = default_data(kind).to_value()?;
                let data = validate_kind(kind, &overlay(kind, base, data.as_ref())?)?;

                let page = doc.page(page_id)?;
                let index = index.unwrap_or(page.blocks.len());
                let block = Block::new(doc.id_generator().new_id(), data, style.clone().unwrap_or_default());

                Ok(Step::Insert {
                    page_id: page_id.clone(),
                    index,
                    block,
                })
            }

            OperationKind::UpdateBlock {
                page_id,
                block_id,
                data,
                style,
            } => {
                let existing = doc
                    .page(page_id)?
                    .block(block_id)
                    .ok_or_else(|| DocumentError::BlockNotFound {
                        page_id: page_id.clone(),
                        block_id: block_id.clone(),
                    })?;

                let kind = existing.kind();
                let base = existing.data().to_value()?;
                let data = validate_kind(kind, &overlay(kind, base, data.as_ref())?)?;

                Ok(Step::Replace {
                    page_id: page_id.clone(),
                    block_id: block_id.clone(),
                    data,
                    style: style.clone().unwrap_or_else(|| existing.style().clone()),
                })
            }

            OperationKind::RemoveBlock { page_id, block_id } => Ok(Step::Remove {
                page_id: page_id.clone(),
                block_id: block_id.clone(),
            }),

            OperationKind::UpdateTheme { theme } => Ok(Step::Theme(theme.clone())),

            OperationKind::UpdateSeo { page_id, seo } => Ok(Step::Seo {
                page_id: page_id.clone(),
                seo: seo.clone(),
            }),
        }
    }
}

/// Top-level fields of `patch` replace those of `base`; a `null` clears one
fn overlay(kind: BlockType, base: Value, patch: Option<&Value>) -> Result<Value, SchemaError> {
    let Some(patch) = patch else {
        return Ok(base);
    };

    let patch = patch
        .as_object()
        .ok_or(SchemaError::NotAnObject { block_type: kind })?;

    let mut merged = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (key, value) in patch {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }

    Ok(Value::Object(merged))
}

/// A document primitive with validated arguments
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Insert {
        page_id: PageId,
        index: usize,
        block: Block,
    },
    Replace {
        page_id: PageId,
        block_id: BlockId,
        data: BlockData,
        style: BlockStyle,
    },
    Remove {
        page_id: PageId,
        block_id: BlockId,
    },
    Theme(Theme),
    Seo {
        page_id: Option<PageId>,
        seo: Seo,
    },
}

impl Step {
    /// Block type whose plan feature must be checked before applying
    pub(crate) fn gated_type(&self) -> Option<BlockType> {
        let kind = match self {
            Step::Insert { block, .. } => block.kind(),
            Step::Replace { data, .. } => data.kind(),
            _ => return None,
        };
        kind.required_feature().map(|_| kind)
    }

    pub(crate) fn apply(self, doc: &Document) -> Result<Document, DocumentError> {
        match self {
            Step::Insert { page_id, index, block } => doc.insert_block(&page_id, index, block),
            Step::Replace {
                page_id,
                block_id,
                data,
                style,
            } => doc.replace_block(&page_id, &block_id, data, style),
            Step::Remove { page_id, block_id } => doc.remove_block(&page_id, &block_id),
            Step::Theme(theme) => doc.set_theme(theme),
            Step::Seo { page_id, seo } => doc.set_seo(page_id.as_ref(), seo),
        }
    }
}

/// An immutable, timestamped proposal to mutate one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
}

impl Operation {
    pub fn new(id: impl Into<OperationId>, kind: OperationKind) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            description: String::new(),
            kind,
            preview: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_preview(mut self, preview: Preview) -> Self {
        self.preview = Some(preview);
        self
    }
}

/// Token accounting reported by the AI provider, passed through untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Operations proposed together, e.g. from one AI response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub id: ChangesetId,
    pub project_id: ProjectId,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Changeset {
    pub fn new(id: impl Into<ChangesetId>, project_id: ProjectId, operations: Vec<Operation>) -> Self {
        Self {
            id: id.into(),
            project_id,
            operations,
            usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_wire_form() {
        let json = json!({
            "id": "op-1",
            "createdAt": "2024-05-01T12:00:00Z",
            "type": "update_block",
            "description": "Shorten the headline",
            "payload": { "pageId": "home", "blockId": "a1-1", "data": { "headline": "Hi" } },
            "preview": { "label": "Hero", "before": "Hello there", "after": "Hi" }
        });

        let op: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(op.id, OperationId::new("op-1"));
        assert_eq!(op.kind.type_name(), "update_block");
        match &op.kind {
            OperationKind::UpdateBlock { block_id, data, style, .. } => {
                assert_eq!(block_id.as_str(), "a1-1");
                assert_eq!(data.as_ref().unwrap()["headline"], "Hi");
                assert!(style.is_none());
            }
            other => panic!("Expected update_block, got {other:?}"),
        }
        assert_eq!(op.preview.unwrap().after.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_operation_serializes_type_and_payload() {
        let op = Operation::new(
            "op-2",
            OperationKind::RemoveBlock {
                page_id: PageId::new("home"),
                block_id: BlockId::new("b-1"),
            },
        );

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "remove_block");
        assert_eq!(value["payload"]["blockId"], "b-1");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_token_usage_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u64::MAX,
            output_tokens: 7,
        };
        assert_eq!(usage.total(), u64::MAX);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OperationState::Proposed.is_terminal());
        assert!(!OperationState::Accepted.is_terminal());
        assert!(OperationState::Dismissed.is_terminal());
        assert!(OperationState::Applied.is_terminal());
        assert!(OperationState::Rejected.is_terminal());
    }

    #[test]
    fn test_overlay() {
        let base = json!({ "headline": "A", "subheadline": "B" });
        let merged = overlay(
            BlockType::Hero,
            base,
            Some(&json!({ "headline": "C", "subheadline": null })),
        )
        .unwrap();
        assert_eq!(merged, json!({ "headline": "C" }));

        let err = overlay(BlockType::Hero, json!({}), Some(&json!([1, 2])));
        assert_eq!(err, Err(SchemaError::NotAnObject { block_type: BlockType::Hero }));
    }
}
