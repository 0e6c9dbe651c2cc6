//! # Project Service
//!
//! Front door for every change to a stored project. Each project has one
//! [`EditSession`] behind an async mutex; a mutation holds that lock from
//! the plan check through the store write, so two requests can never both
//! pass a limit that only one of them fits in.
//!
//! Changes are staged on a copy of the session and only adopted once the
//! store has accepted the new snapshot. A timeout or store failure leaves
//! the project as it was, and because applying is idempotent by operation
//! id the caller can simply retry.

use crate::collaborator::{AiProvider, Billing, CollaboratorError, CustomerDirectory, Hold, Reservation};
use crate::publish::{build_site, Site};
use crate::store::{ProjectStore, StoreError};
use sitecraft_compiler_html::RenderOptions;
use sitecraft_document::{Document, DocumentError, Page, Project, SiteSettings};
use sitecraft_editor::{
    ApplyReport, Changeset, ChangesetId, EditSession, EditorError, GateContext, OperationId, DEFAULT_HISTORY_DEPTH,
};
use sitecraft_plans::{resolve_settings, Decision, Denial, Gate, GateError, PlanCatalog, PlanGate, PlanTier, UsageSnapshot};
use sitecraft_schema::{CustomerId, PageId, ProjectId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("Project already exists: {0}")]
    ProjectExists(ProjectId),

    #[error("Project was deleted: {0}")]
    ProjectDeleted(ProjectId),

    #[error("Not allowed by plan: {0}")]
    PlanDenied(Denial),

    #[error("AI request refused by billing: {0}")]
    BillingDenied(String),

    #[error("{collaborator} did not answer within {after:?}")]
    Timeout {
        collaborator: &'static str,
        after: Duration,
    },

    #[error("{collaborator} failed: {source}")]
    Collaborator {
        collaborator: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Timeouts and limits for [`ProjectService`]
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub store_timeout: Duration,
    pub directory_timeout: Duration,
    pub billing_timeout: Duration,
    pub ai_timeout: Duration,

    /// Credits held before each AI call, settled against the tokens used
    pub estimated_ai_cost: u64,

    /// Undo levels kept per project
    pub history_depth: usize,

    pub catalog: PlanCatalog,
    pub render: RenderOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            directory_timeout: Duration::from_secs(5),
            billing_timeout: Duration::from_secs(5),
            ai_timeout: Duration::from_secs(60),
            estimated_ai_cost: 4_000,
            history_depth: DEFAULT_HISTORY_DEPTH,
            catalog: PlanCatalog::default(),
            render: RenderOptions::default(),
        }
    }
}

type SharedSession = Arc<Mutex<EditSession>>;

pub struct ProjectService {
    store: Arc<dyn ProjectStore>,
    directory: Arc<dyn CustomerDirectory>,
    ai: Arc<dyn AiProvider>,
    billing: Arc<dyn Billing>,
    config: ServiceConfig,

    sessions: Mutex<HashMap<ProjectId, SharedSession>>,

    /// Serialises site-limit check and insert per customer
    creation_locks: Mutex<HashMap<CustomerId, Arc<Mutex<()>>>>,

    changeset_seq: AtomicU64,
}

/// Run a collaborator call under a deadline
async fn within<F: Future>(collaborator: &'static str, after: Duration, call: F) -> Result<F::Output, ServiceError> {
    tokio::time::timeout(after, call).await.map_err(|_| {
        tracing::warn!(collaborator, ?after, "collaborator timed out");
        ServiceError::Timeout { collaborator, after }
    })
}

impl ProjectService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        directory: Arc<dyn CustomerDirectory>,
        ai: Arc<dyn AiProvider>,
        billing: Arc<dyn Billing>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            directory,
            ai,
            billing,
            config,
            sessions: Mutex::new(HashMap::new()),
            creation_locks: Mutex::new(HashMap::new()),
            changeset_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create an empty project, if the customer's plan has room for it
    pub async fn create_project(
        &self,
        customer: &CustomerId,
        project_id: impl Into<ProjectId>,
        business_name: &str,
    ) -> Result<Document, ServiceError> {
        let project_id = project_id.into();

        let lock = self
            .creation_locks
            .lock()
            .await
            .entry(customer.clone())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.create_locked(customer, project_id, business_name).await
        };

        // Forget the lock once no other creation for this customer waits on it
        let mut locks = self.creation_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(customer);
        }
        result
    }

    /// Site-limit check and insert; the caller holds the customer's
    /// creation lock
    async fn create_locked(
        &self,
        customer: &CustomerId,
        project_id: ProjectId,
        business_name: &str,
    ) -> Result<Document, ServiceError> {
        if self.load(&project_id).await?.is_some() {
            return Err(ServiceError::ProjectExists(project_id));
        }

        let plan = self.plan_for(customer).await?;
        let sites = self.count_sites(customer).await?;
        let usage = UsageSnapshot::new(customer.clone(), plan, sites);
        let decision = PlanGate::new(&self.config.catalog, &usage).check_site_limit(customer)?;
        if let Decision::Denied(denial) = decision {
            tracing::warn!(customer = %customer, plan = %plan, sites, "site limit reached");
            return Err(ServiceError::PlanDenied(denial));
        }

        let document = Document::new(Project::new(project_id.clone(), customer.clone(), business_name))?;
        self.insert(document.project()).await?;

        let session = EditSession::with_history_depth(document.clone(), self.config.history_depth);
        self.sessions
            .lock()
            .await
            .insert(project_id.clone(), Arc::new(Mutex::new(session)));

        tracing::info!(project = %project_id, customer = %customer, "project created");
        Ok(document)
    }

    /// Latest snapshot of a project
    pub async fn document(&self, project_id: &ProjectId) -> Result<Document, ServiceError> {
        let shared = self.session(project_id).await?;
        let session = shared.lock().await;
        Ok(session.document().clone())
    }

    /// Ask the AI provider for edits to one page and register them as
    /// Proposed.
    ///
    /// Billing holds the estimated cost first; a refused hold means the
    /// provider is never called. The session lock is not held while the
    /// provider works.
    pub async fn propose(
        &self,
        project_id: &ProjectId,
        page_id: &PageId,
        instruction: &str,
    ) -> Result<Changeset, ServiceError> {
        let snapshot = self.document(project_id).await?;
        let project = snapshot.project();
        if project.is_deleted() {
            return Err(ServiceError::ProjectDeleted(project_id.clone()));
        }
        let page = snapshot.page(page_id)?;
        let customer = &project.customer_id;

        let hold = match self.reserve(customer).await? {
            Reservation::Allowed(hold) => hold,
            Reservation::Denied { reason } => {
                tracing::warn!(project = %project_id, customer = %customer, %reason, "AI request refused by billing");
                return Err(ServiceError::BillingDenied(reason));
            }
        };

        let proposal = within("AI provider", self.config.ai_timeout, self.ai.propose(project, page, instruction))
            .await
            .and_then(|result| {
                result.map_err(|source| ServiceError::Collaborator {
                    collaborator: "AI provider",
                    source,
                })
            });
        let proposal = match proposal {
            Ok(proposal) => proposal,
            Err(e) => {
                self.settle(hold, 0).await;
                return Err(e);
            }
        };
        self.settle(hold, proposal.usage.total()).await;

        let seq = self.changeset_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut changeset = Changeset::new(
            format!("{project_id}-cs-{seq}"),
            project_id.clone(),
            proposal.operations,
        );
        changeset.usage = Some(proposal.usage);

        let shared = self.session(project_id).await?;
        shared.lock().await.propose(changeset.clone())?;

        tracing::info!(
            project = %project_id,
            changeset = %changeset.id,
            operations = changeset.operations.len(),
            tokens = proposal.usage.total(),
            "changeset proposed"
        );
        Ok(changeset)
    }

    /// Accept one proposed operation; see [`EditSession::accept`]
    pub async fn accept(&self, project_id: &ProjectId, op_id: &OperationId) -> Result<Document, ServiceError> {
        self.edit(project_id, |session, ctx| session.accept(op_id, ctx)).await
    }

    /// Proposed → Dismissed. Needs neither the plan nor the store.
    pub async fn dismiss(&self, project_id: &ProjectId, op_id: &OperationId) -> Result<(), ServiceError> {
        let shared = self.session(project_id).await?;
        let mut session = shared.lock().await;
        if session.document().project().is_deleted() {
            return Err(ServiceError::ProjectDeleted(project_id.clone()));
        }
        Ok(session.dismiss(op_id)?)
    }

    /// Accept every remaining operation of a changeset in order
    pub async fn apply_all(
        &self,
        project_id: &ProjectId,
        changeset_id: &ChangesetId,
    ) -> Result<ApplyReport, ServiceError> {
        self.edit(project_id, |session, ctx| session.apply_all(changeset_id, ctx))
            .await
    }

    /// Add a page, if the plan's page limit allows one more
    pub async fn add_page(&self, project_id: &ProjectId, page: Page) -> Result<Document, ServiceError> {
        self.edit(project_id, |session, ctx| {
            let project = &session.document().project().id;
            if let Decision::Denied(denial) = ctx.gate.check_page_limit(&ctx.customer, project)? {
                return Err(EditorError::PlanDenied(denial));
            }

            let description = format!("add page {}", page.slug);
            let next = session.document().add_page(page)?;
            session.commit(next.clone(), description);
            Ok(next)
        })
        .await
    }

    pub async fn remove_page(&self, project_id: &ProjectId, page_id: &PageId) -> Result<Document, ServiceError> {
        self.edit(project_id, |session, _| {
            let next = session.document().remove_page(page_id)?;
            session.commit(next.clone(), format!("remove page {page_id}"));
            Ok(next)
        })
        .await
    }

    pub async fn set_home_page(&self, project_id: &ProjectId, page_id: &PageId) -> Result<Document, ServiceError> {
        self.edit(project_id, |session, _| {
            let next = session.document().set_home_page(page_id)?;
            session.commit(next.clone(), format!("set home page {page_id}"));
            Ok(next)
        })
        .await
    }

    /// Store site settings as requested; the plan decides at publish time
    /// which of them take effect
    pub async fn update_settings(
        &self,
        project_id: &ProjectId,
        settings: SiteSettings,
    ) -> Result<Document, ServiceError> {
        self.edit(project_id, |session, _| {
            let next = session.document().update_settings(settings)?;
            session.commit(next.clone(), "update settings");
            Ok(next)
        })
        .await
    }

    pub async fn undo(&self, project_id: &ProjectId) -> Result<Option<Document>, ServiceError> {
        self.edit(project_id, |session, _| session.undo()).await
    }

    pub async fn redo(&self, project_id: &ProjectId) -> Result<Option<Document>, ServiceError> {
        self.edit(project_id, |session, _| session.redo()).await
    }

    /// Tombstone a project. It stops counting towards the site limit but
    /// is kept in the store.
    pub async fn delete_project(&self, project_id: &ProjectId) -> Result<Document, ServiceError> {
        let shared = self.session(project_id).await?;
        let mut session = shared.lock().await;
        if session.document().project().is_deleted() {
            return Err(ServiceError::ProjectDeleted(project_id.clone()));
        }

        let next = session.document().tombstone(chrono::Utc::now())?;
        self.save(next.project()).await?;
        session.commit(next.clone(), "delete project");
        drop(session);

        self.sessions.lock().await.remove(project_id);
        tracing::info!(project = %project_id, "project deleted");
        Ok(next)
    }

    /// Drop the in-memory session of a project. Operations still Proposed
    /// are forgotten; the stored project is untouched and the next call
    /// reopens it from the store.
    pub async fn close_session(&self, project_id: &ProjectId) -> bool {
        let closed = self.sessions.lock().await.remove(project_id).is_some();
        if closed {
            tracing::debug!(project = %project_id, "session closed");
        }
        closed
    }

    /// Number of projects with a session in memory
    pub async fn open_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Render every page of the latest snapshot.
    ///
    /// Site settings the owner's plan does not include are dropped before
    /// rendering. Rendering works on a copy, outside the session lock.
    pub async fn publish(&self, project_id: &ProjectId) -> Result<Site, ServiceError> {
        let snapshot = self.document(project_id).await?;
        let project = snapshot.project();
        if project.is_deleted() {
            return Err(ServiceError::ProjectDeleted(project_id.clone()));
        }

        let customer = &project.customer_id;
        let plan = self.plan_for(customer).await?;
        let usage = UsageSnapshot::new(customer.clone(), plan, 0);
        let settings = resolve_settings(
            &project.settings,
            customer,
            &PlanGate::new(&self.config.catalog, &usage),
        )?;

        let mut resolved = project.clone();
        resolved.settings = settings;
        let site = build_site(&resolved, &self.config.render);

        tracing::info!(project = %project_id, version = snapshot.version(), pages = site.pages.len(), "site published");
        Ok(site)
    }

    /// Run `f` on a copy of the project's session under its lock, with a
    /// gate built from usage fetched just now. The copy replaces the
    /// session once any new snapshot is saved.
    async fn edit<T>(
        &self,
        project_id: &ProjectId,
        f: impl FnOnce(&mut EditSession, &GateContext<'_>) -> Result<T, EditorError>,
    ) -> Result<T, ServiceError> {
        let shared = self.session(project_id).await?;
        let mut session = shared.lock().await;

        let project = session.document().project();
        if project.is_deleted() {
            return Err(ServiceError::ProjectDeleted(project_id.clone()));
        }
        let customer = project.customer_id.clone();
        let usage = self.usage(project).await?;

        let (result, draft) = {
            let gate = PlanGate::new(&self.config.catalog, &usage);
            let ctx = GateContext::new(customer, &gate);
            let mut draft = session.clone();
            let result = f(&mut draft, &ctx);
            (result, draft)
        };

        if !draft.document().same_snapshot(session.document()) {
            self.save(draft.document().project()).await?;
        }
        *session = draft;

        Ok(result?)
    }

    async fn session(&self, project_id: &ProjectId) -> Result<SharedSession, ServiceError> {
        if let Some(shared) = self.sessions.lock().await.get(project_id) {
            return Ok(shared.clone());
        }

        let project = self
            .load(project_id)
            .await?
            .ok_or_else(|| ServiceError::ProjectNotFound(project_id.clone()))?;
        let document = Document::new(project)?;
        tracing::debug!(project = %project_id, "session opened");

        let shared = self
            .sessions
            .lock()
            .await
            .entry(project_id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(EditSession::with_history_depth(
                    document,
                    self.config.history_depth,
                )))
            })
            .clone();
        Ok(shared)
    }

    async fn usage(&self, project: &Project) -> Result<UsageSnapshot, ServiceError> {
        let customer = &project.customer_id;
        let plan = self.plan_for(customer).await?;
        let sites = self.count_sites(customer).await?;
        Ok(UsageSnapshot::new(customer.clone(), plan, sites).with_pages(project.id.clone(), project.pages.len() as u32))
    }

    async fn load(&self, project_id: &ProjectId) -> Result<Option<Project>, ServiceError> {
        Ok(within("store", self.config.store_timeout, self.store.load_project(project_id)).await??)
    }

    async fn save(&self, project: &Project) -> Result<(), ServiceError> {
        Ok(within("store", self.config.store_timeout, self.store.save_project(project)).await??)
    }

    async fn insert(&self, project: &Project) -> Result<(), ServiceError> {
        match within("store", self.config.store_timeout, self.store.create_project(project)).await? {
            Err(StoreError::ProjectExists(id)) => Err(ServiceError::ProjectExists(id)),
            other => Ok(other?),
        }
    }

    async fn count_sites(&self, customer: &CustomerId) -> Result<u32, ServiceError> {
        Ok(within("store", self.config.store_timeout, self.store.count_projects(customer)).await??)
    }

    async fn plan_for(&self, customer: &CustomerId) -> Result<PlanTier, ServiceError> {
        within("customer directory", self.config.directory_timeout, self.directory.plan_for(customer))
            .await?
            .map_err(|source| ServiceError::Collaborator {
                collaborator: "customer directory",
                source,
            })
    }

    async fn reserve(&self, customer: &CustomerId) -> Result<Reservation, ServiceError> {
        within(
            "billing",
            self.config.billing_timeout,
            self.billing.reserve(customer, self.config.estimated_ai_cost),
        )
        .await?
        .map_err(|source| ServiceError::Collaborator {
            collaborator: "billing",
            source,
        })
    }

    /// Settling is best effort; the proposal outcome does not depend on it
    async fn settle(&self, hold: Hold, actual_cost: u64) {
        let hold_id = hold.id.clone();
        match within("billing", self.config.billing_timeout, self.billing.settle(hold, actual_cost)).await {
            Ok(Ok(())) => tracing::debug!(hold = %hold_id, actual_cost, "AI usage settled"),
            Ok(Err(e)) => tracing::warn!(hold = %hold_id, error = %e, "failed to settle AI usage"),
            Err(e) => tracing::warn!(hold = %hold_id, error = %e, "failed to settle AI usage"),
        }
    }
}
