//! Persistence of whole projects.
//!
//! The store is a load/save boundary only. Locking, plan checks and
//! invariants of edits belong to the service sitting in front of it.

use async_trait::async_trait;
use sitecraft_document::{check_invariants, DocumentError, Page, Project};
use sitecraft_schema::{CustomerId, PageId, ProjectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("Project already exists: {0}")]
    ProjectExists(ProjectId),

    #[error("Page not found: {page_id} in project {project_id}")]
    PageNotFound { project_id: ProjectId, page_id: PageId },

    #[error("Invalid project id for storage: {0}")]
    InvalidId(ProjectId),

    #[error("Stored project is invalid: {0}")]
    Invalid(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn load_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError>;

    async fn save_project(&self, project: &Project) -> Result<(), StoreError>;

    /// Store a new project; `ProjectExists` if its id is taken, whoever
    /// owns it. Check and insert are one step.
    async fn create_project(&self, project: &Project) -> Result<(), StoreError>;

    /// Live (not tombstoned) projects owned by `customer`
    async fn count_projects(&self, customer: &CustomerId) -> Result<u32, StoreError>;

    async fn load_page(&self, project_id: &ProjectId, page_id: &PageId) -> Result<Option<Page>, StoreError> {
        let project = self.load_project(project_id).await?;
        Ok(project.and_then(|p| p.page(page_id).cloned()))
    }

    /// Replace one page of a stored project
    async fn save_page(&self, project_id: &ProjectId, page: &Page) -> Result<(), StoreError> {
        let mut project = self
            .load_project(project_id)
            .await?
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.clone()))?;

        let slot = project
            .pages
            .iter_mut()
            .find(|p| p.id == page.id)
            .ok_or_else(|| StoreError::PageNotFound {
                project_id: project_id.clone(),
                page_id: page.id.clone(),
            })?;
        *slot = page.clone();

        check_invariants(&project)?;
        self.save_project(&project).await
    }
}

/// Projects held in memory, for tests and previews
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn load_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }

    async fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        self.projects
            .write()
            .await
            .insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(StoreError::ProjectExists(project.id.clone()));
        }
        projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn count_projects(&self, customer: &CustomerId) -> Result<u32, StoreError> {
        let projects = self.projects.read().await;
        let count = projects
            .values()
            .filter(|p| &p.customer_id == customer && !p.is_deleted())
            .count();
        Ok(count as u32)
    }
}

/// Suffix of project files written by [`FileStore`]
pub const PROJECT_FILE_SUFFIX: &str = ".site.json";

/// Distinguishes temp files of concurrent creations of one id
static CREATE_SEQ: AtomicU64 = AtomicU64::new(0);

/// One pretty-printed JSON file per project inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{project_id}.site.json`
    pub fn path_for(&self, project_id: &ProjectId) -> Result<PathBuf, StoreError> {
        let id = project_id.as_str();
        let safe = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !safe {
            return Err(StoreError::InvalidId(project_id.clone()));
        }
        Ok(self.root.join(format!("{id}{PROJECT_FILE_SUFFIX}")))
    }
}

#[async_trait]
impl ProjectStore for FileStore {
    async fn load_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let path = self.path_for(project_id)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let project: Project = serde_json::from_str(&raw)?;
        check_invariants(&project)?;
        Ok(Some(project))
    }

    /// Written to a temp file first, then renamed over the old one
    async fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        let path = self.path_for(&project.id)?;
        let tmp = self
            .root
            .join(format!(".{}{PROJECT_FILE_SUFFIX}.tmp", project.id.as_str()));
        let json = serde_json::to_string_pretty(project)?;

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(project = %project.id, path = %path.display(), "project saved");
        Ok(())
    }

    /// The complete file is hard-linked into place, which fails if the
    /// target already exists
    async fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        let path = self.path_for(&project.id)?;
        let seq = CREATE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .root
            .join(format!(".{}{PROJECT_FILE_SUFFIX}.{seq}.new", project.id.as_str()));
        let json = serde_json::to_string_pretty(project)?;

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&tmp, json).await?;
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        tokio::fs::remove_file(&tmp).await?;

        match linked {
            Ok(()) => {
                tracing::debug!(project = %project.id, path = %path.display(), "project created");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::ProjectExists(project.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_projects(&self, customer: &CustomerId) -> Result<u32, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') || !name.ends_with(PROJECT_FILE_SUFFIX) {
                continue;
            }

            let path = entry.path();
            let raw = tokio::fs::read_to_string(&path).await?;
            let project: Project = match serde_json::from_str(&raw) {
                Ok(project) => project,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable project file");
                    continue;
                }
            };
            if &project.customer_id == customer && !project.is_deleted() {
                count += 1;
            }
        }
        Ok(count)
    }
}
