//! # Document Snapshot
//!
//! A Document is one immutable state of a project.
//!
//! Every primitive borrows the current snapshot and returns the next one:
//!
//! ```text
//! Document(v1) ── insert_block ──→ Document(v2)
//!      │                               │
//!   Arc<Project>                  Arc<Project> (new)
//! ```
//!
//! Holders of an older snapshot keep seeing exactly what they saw; a
//! refused primitive returns an error and produces no snapshot at all.

use crate::errors::DocumentError;
use crate::project::{is_valid_slug, Page, Project, Seo, SiteSettings};
use chrono::{DateTime, Utc};
use sitecraft_schema::{Block, BlockData, BlockId, BlockStyle, IdGenerator, PageId, Theme};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Document {
    project: Arc<Project>,

    /// Increments with every successful primitive
    version: u64,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.project == other.project
    }
}

impl Document {
    /// Wrap a project after checking every structural invariant
    pub fn new(project: Project) -> Result<Self, DocumentError> {
        check_invariants(&project)?;
        Ok(Self {
            project: Arc::new(project),
            version: 0,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether both handles point at the very same snapshot
    pub fn same_snapshot(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.project, &other.project)
    }

    pub fn page(&self, page_id: &PageId) -> Result<&Page, DocumentError> {
        self.project
            .page(page_id)
            .ok_or_else(|| DocumentError::PageNotFound(page_id.clone()))
    }

    /// Id generator positioned after the last id this project handed out
    pub fn id_generator(&self) -> IdGenerator {
        IdGenerator::resume(self.project.id.as_str(), self.project.block_sequence)
    }

    /// Insert `block` at `index` on a page.
    ///
    /// An index past the end is clamped to the end of the page.
    pub fn insert_block(
        &self,
        page_id: &PageId,
        index: usize,
        block: Block,
    ) -> Result<Document, DocumentError> {
        let ids = self.id_generator();

        self.mutate(|project| {
            let page = page_mut(project, page_id)?;

            if page.block(block.id()).is_some() {
                return Err(DocumentError::invariant(format!(
                    "block id {} already exists on page {}",
                    block.id(),
                    page_id
                )));
            }

            let clamped = index.min(page.blocks.len());
            if clamped != index {
                tracing::debug!(requested = index, clamped, page = %page_id, "insertion index clamped");
            }

            let sequence = ids.sequence_of(block.id());
            page.blocks.insert(clamped, block);

            if let Some(n) = sequence {
                project.block_sequence = project.block_sequence.max(n);
            }
            Ok(())
        })
    }

    /// Replace the content of an existing block, keeping its id and type
    pub fn replace_block(
        &self,
        page_id: &PageId,
        block_id: &BlockId,
        data: BlockData,
        style: BlockStyle,
    ) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            let page = page_mut(project, page_id)?;
            let position = find_block(page, block_id)?;

            page.blocks[position] = page.blocks[position]
                .with_content(data, style)
                .map_err(|e| DocumentError::invariant(e.to_string()))?;
            Ok(())
        })
    }

    pub fn remove_block(&self, page_id: &PageId, block_id: &BlockId) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            let page = page_mut(project, page_id)?;
            let position = find_block(page, block_id)?;
            page.blocks.remove(position);
            Ok(())
        })
    }

    pub fn set_theme(&self, theme: Theme) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            project.theme = theme;
            Ok(())
        })
    }

    /// Set page-level SEO, or the project's SEO when `page_id` is `None`
    pub fn set_seo(&self, page_id: Option<&PageId>, seo: Seo) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            match page_id {
                Some(page_id) => page_mut(project, page_id)?.seo = Some(seo),
                None => project.seo = seo,
            }
            Ok(())
        })
    }

    /// Append a page. Marking it as home moves the home flag to it.
    pub fn add_page(&self, page: Page) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            if project.page(&page.id).is_some() {
                return Err(DocumentError::invariant(format!("page id {} already exists", page.id)));
            }
            if page.is_home_page {
                for existing in &mut project.pages {
                    existing.is_home_page = false;
                }
            }
            project.pages.push(page);
            Ok(())
        })
    }

    /// Delete a page that is neither the home page nor the last page
    pub fn remove_page(&self, page_id: &PageId) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            let position = project
                .pages
                .iter()
                .position(|p| &p.id == page_id)
                .ok_or_else(|| DocumentError::PageNotFound(page_id.clone()))?;

            if project.pages[position].is_home_page {
                return Err(DocumentError::invariant("the home page cannot be deleted"));
            }
            if project.pages.len() == 1 {
                return Err(DocumentError::invariant("the last page cannot be deleted"));
            }

            project.pages.remove(position);
            Ok(())
        })
    }

    pub fn set_home_page(&self, page_id: &PageId) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            if project.page(page_id).is_none() {
                return Err(DocumentError::PageNotFound(page_id.clone()));
            }
            for page in &mut project.pages {
                page.is_home_page = &page.id == page_id;
            }
            Ok(())
        })
    }

    pub fn update_settings(&self, settings: SiteSettings) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            project.settings = settings;
            Ok(())
        })
    }

    /// Soft-delete the project. Every later primitive is refused.
    pub fn tombstone(&self, at: DateTime<Utc>) -> Result<Document, DocumentError> {
        self.mutate(|project| {
            project.deleted_at = Some(at);
            Ok(())
        })
    }

    /// Bring back the content of an earlier snapshot as the next version.
    ///
    /// The block sequence never moves backwards, so ids handed out after
    /// `earlier` was taken stay retired.
    pub fn restore(&self, earlier: &Document) -> Result<Document, DocumentError> {
        let sequence = self.project.block_sequence;
        let content = Project::clone(&earlier.project);

        self.mutate(move |project| {
            *project = content;
            project.block_sequence = project.block_sequence.max(sequence);
            Ok(())
        })
    }

    /// Clone the project, run `f` on the clone, re-check invariants and
    /// wrap the result as the next snapshot
    fn mutate<F>(&self, f: F) -> Result<Document, DocumentError>
    where
        F: FnOnce(&mut Project) -> Result<(), DocumentError>,
    {
        if let Some(at) = self.project.deleted_at {
            return Err(DocumentError::invariant(format!(
                "project {} was deleted at {}",
                self.project.id,
                at.to_rfc3339()
            )));
        }

        let mut next = Project::clone(&self.project);
        f(&mut next)?;
        check_invariants(&next)?;

        Ok(Document {
            project: Arc::new(next),
            version: self.version + 1,
        })
    }
}

fn page_mut<'a>(project: &'a mut Project, page_id: &PageId) -> Result<&'a mut Page, DocumentError> {
    project
        .pages
        .iter_mut()
        .find(|p| &p.id == page_id)
        .ok_or_else(|| DocumentError::PageNotFound(page_id.clone()))
}

fn find_block(page: &Page, block_id: &BlockId) -> Result<usize, DocumentError> {
    page.block_position(block_id)
        .ok_or_else(|| DocumentError::BlockNotFound {
            page_id: page.id.clone(),
            block_id: block_id.clone(),
        })
}

/// Structural invariants every snapshot must satisfy
pub fn check_invariants(project: &Project) -> Result<(), DocumentError> {
    if project.pages.is_empty() {
        return Err(DocumentError::invariant("a project needs at least one page"));
    }

    let homes = project.pages.iter().filter(|p| p.is_home_page).count();
    if homes != 1 {
        return Err(DocumentError::invariant(format!(
            "exactly one home page is required, found {homes}"
        )));
    }

    let mut page_ids = HashSet::new();
    let mut slugs = HashSet::new();

    for page in &project.pages {
        if !page_ids.insert(&page.id) {
            return Err(DocumentError::invariant(format!("duplicate page id {}", page.id)));
        }
        if !is_valid_slug(&page.slug) {
            return Err(DocumentError::invariant(format!("slug `{}` is not URL-safe", page.slug)));
        }
        if !slugs.insert(page.slug.as_str()) {
            return Err(DocumentError::invariant(format!("duplicate slug `{}`", page.slug)));
        }

        let mut block_ids = HashSet::new();
        for block in &page.blocks {
            if !block_ids.insert(block.id()) {
                return Err(DocumentError::invariant(format!(
                    "duplicate block id {} on page {}",
                    block.id(),
                    page.id
                )));
            }
        }
    }

    Ok(())
}
