//! Service tests: plan limits, AI proposals, billing, timeouts and
//! recovery from store failures.

use async_trait::async_trait;
use serde_json::json;
use sitecraft_document::{Page, Project, SiteSettings};
use sitecraft_editor::{EditorError, Operation, OperationId, OperationKind, OperationState, TokenUsage};
use sitecraft_plans::PlanTier;
use sitecraft_schema::{BlockType, CustomerId, PageId, ProjectId};
use sitecraft_workspace::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Returns the same operations for every instruction
struct ScriptedAi {
    operations: Vec<Operation>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedAi {
    fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl AiProvider for ScriptedAi {
    async fn propose(&self, _project: &Project, _page: &Page, _instruction: &str) -> Result<Proposal, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Proposal {
            operations: self.operations.clone(),
            usage: TokenUsage {
                input_tokens: 1_200,
                output_tokens: 300,
            },
        })
    }
}

/// Memory store whose saves can be made to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

#[async_trait]
impl ProjectStore for FlakyStore {
    async fn load_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        self.inner.load_project(project_id).await
    }

    async fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        self.inner.save_project(project).await
    }

    async fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        self.inner.create_project(project).await
    }

    async fn count_projects(&self, customer: &CustomerId) -> Result<u32, StoreError> {
        self.inner.count_projects(customer).await
    }
}

/// Memory store whose loads wait until two callers have read
struct RacingStore {
    inner: MemoryStore,
    barrier: tokio::sync::Barrier,
}

#[async_trait]
impl ProjectStore for RacingStore {
    async fn load_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let project = self.inner.load_project(project_id).await;
        self.barrier.wait().await;
        project
    }

    async fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        self.inner.save_project(project).await
    }

    async fn create_project(&self, project: &Project) -> Result<(), StoreError> {
        self.inner.create_project(project).await
    }

    async fn count_projects(&self, customer: &CustomerId) -> Result<u32, StoreError> {
        self.inner.count_projects(customer).await
    }
}

/// Directory that can be made to hang
struct StallingDirectory {
    plan: PlanTier,
    stalled: AtomicBool,
}

#[async_trait]
impl CustomerDirectory for StallingDirectory {
    async fn plan_for(&self, _customer: &CustomerId) -> Result<PlanTier, CollaboratorError> {
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        Ok(self.plan)
    }
}

struct Harness {
    service: ProjectService,
    store: Arc<FlakyStore>,
    ai: Arc<ScriptedAi>,
    billing: Arc<CreditLedger>,
}

async fn harness(plan: PlanTier, ai: ScriptedAi, config: ServiceConfig) -> Harness {
    let store = Arc::new(FlakyStore::default());
    let ai = Arc::new(ai);
    let billing = Arc::new(CreditLedger::new());
    billing.top_up("c-1", 10_000).await;

    let service = ProjectService::new(
        store.clone(),
        Arc::new(StaticDirectory::new(plan)),
        ai.clone(),
        billing.clone(),
        config,
    );
    Harness {
        service,
        store,
        ai,
        billing,
    }
}

fn customer() -> CustomerId {
    CustomerId::new("c-1")
}

fn home() -> PageId {
    PageId::new("home")
}

fn add_cta(id: &str) -> Operation {
    Operation::new(
        id,
        OperationKind::AddBlock {
            page_id: home(),
            block_type: "cta".into(),
            data: Some(json!({ "headline": "Order a cake" })),
            style: None,
            index: None,
        },
    )
}

#[tokio::test]
async fn test_starter_site_limit_creates_nothing() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![]), ServiceConfig::default()).await;

    h.service.create_project(&customer(), "p-1", "Acme Bakery").await.unwrap();

    match h.service.create_project(&customer(), "p-2", "Second Shop").await {
        Err(ServiceError::PlanDenied(denial)) => assert_eq!(denial.upgrade_to, Some(PlanTier::Pro)),
        other => panic!("Expected a plan denial, got {other:?}"),
    }
    assert_eq!(h.store.load_project(&ProjectId::new("p-2")).await.unwrap(), None);
    assert_eq!(h.store.count_projects(&customer()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_creation_respects_site_limit() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![]), ServiceConfig::default()).await;

    let (c1, c2) = (customer(), customer());
    let (a, b) = tokio::join!(
        h.service.create_project(&c1, "p-1", "First"),
        h.service.create_project(&c2, "p-2", "Second"),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(h.store.count_projects(&customer()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_deleted_project_frees_its_site() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");

    h.service.create_project(&customer(), "p-1", "Old Shop").await.unwrap();
    let deleted = h.service.delete_project(&p1).await.unwrap();
    assert!(deleted.project().is_deleted());

    // Kept in the store, no longer counted.
    assert!(h.store.load_project(&p1).await.unwrap().unwrap().is_deleted());
    h.service.create_project(&customer(), "p-2", "New Shop").await.unwrap();

    assert!(matches!(
        h.service.publish(&p1).await,
        Err(ServiceError::ProjectDeleted(_))
    ));
}

#[tokio::test]
async fn test_page_limit() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();

    for n in 1..5 {
        let slug = format!("page-{n}");
        h.service
            .add_page(&p1, Page::new(slug.as_str(), slug.as_str(), format!("Page {n}")))
            .await
            .unwrap();
    }

    let result = h.service.add_page(&p1, Page::new("extra", "extra", "Extra")).await;
    assert!(matches!(
        result,
        Err(ServiceError::Editor(EditorError::PlanDenied(_)))
    ));
    assert_eq!(h.service.document(&p1).await.unwrap().project().pages.len(), 5);
}

#[tokio::test]
async fn test_propose_and_apply_all() {
    let ops = vec![add_cta("op-1"), add_cta("op-2")];
    let h = harness(PlanTier::Starter, ScriptedAi::new(ops), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();

    let changeset = h.service.propose(&p1, &home(), "Add two calls to action").await.unwrap();
    assert_eq!(changeset.operations.len(), 2);
    assert_eq!(changeset.usage.map(|u| u.total()), Some(1_500));
    // Nothing applied yet.
    assert!(h.service.document(&p1).await.unwrap().project().pages[0].blocks.is_empty());

    h.service.dismiss(&p1, &OperationId::new("op-2")).await.unwrap();
    let report = h.service.apply_all(&p1, &changeset.id).await.unwrap();
    assert_eq!(report.applied, vec![OperationId::new("op-1")]);
    assert_eq!(report.skipped, vec![OperationId::new("op-2")]);

    let stored = h.store.load_project(&p1).await.unwrap().unwrap();
    let kinds: Vec<BlockType> = stored.pages[0].blocks.iter().map(|b| b.kind()).collect();
    assert_eq!(kinds, vec![BlockType::Cta]);

    // Hold of 4000 released, 1500 tokens charged.
    assert_eq!(h.billing.balance(&customer()).await, 8_500);
}

#[tokio::test]
async fn test_billing_denial_skips_ai() {
    let config = ServiceConfig {
        estimated_ai_cost: 50_000,
        ..ServiceConfig::default()
    };
    let h = harness(PlanTier::Pro, ScriptedAi::new(vec![add_cta("op-1")]), config).await;
    let p1 = ProjectId::new("p-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();

    let result = h.service.propose(&p1, &home(), "Add a call to action").await;
    assert!(matches!(result, Err(ServiceError::BillingDenied(_))));
    assert_eq!(h.ai.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ai_timeout_releases_hold() {
    let config = ServiceConfig {
        ai_timeout: Duration::from_millis(20),
        ..ServiceConfig::default()
    };
    let h = harness(PlanTier::Pro, ScriptedAi::slow(Duration::from_secs(10)), config).await;
    let p1 = ProjectId::new("p-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();

    let result = h.service.propose(&p1, &home(), "Redesign everything").await;
    assert!(matches!(
        result,
        Err(ServiceError::Timeout {
            collaborator: "AI provider",
            ..
        })
    ));
    assert_eq!(h.billing.balance(&customer()).await, 10_000);
}

#[tokio::test]
async fn test_failed_save_leaves_operation_proposed() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![add_cta("op-1")]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    let op = OperationId::new("op-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    h.service.propose(&p1, &home(), "Add a call to action").await.unwrap();

    h.store.fail_saves.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.service.accept(&p1, &op).await,
        Err(ServiceError::Store(_))
    ));
    assert!(h.service.document(&p1).await.unwrap().project().pages[0].blocks.is_empty());

    // Retrying once the store is back applies the operation exactly once.
    h.store.fail_saves.store(false, Ordering::SeqCst);
    let first = h.service.accept(&p1, &op).await.unwrap();
    let again = h.service.accept(&p1, &op).await.unwrap();
    assert!(first.same_snapshot(&again));
    assert_eq!(first.project().pages[0].blocks.len(), 1);
}

#[tokio::test]
async fn test_concurrent_accepts_apply_once() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![add_cta("op-1")]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    let op = OperationId::new("op-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    h.service.propose(&p1, &home(), "Add a call to action").await.unwrap();

    let (a, b) = tokio::join!(h.service.accept(&p1, &op), h.service.accept(&p1, &op));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.same_snapshot(&b));
    assert_eq!(a.project().pages[0].blocks.len(), 1);
}

#[tokio::test]
async fn test_gated_operation_rejected_on_starter() {
    let embed = Operation::new(
        "op-1",
        OperationKind::AddBlock {
            page_id: home(),
            block_type: "embed".into(),
            data: Some(json!({ "html": "<script src=\"https://widget.example.com\"></script>" })),
            style: None,
            index: None,
        },
    );
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![embed]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    let changeset = h.service.propose(&p1, &home(), "Add a booking widget").await.unwrap();

    let report = h.service.apply_all(&p1, &changeset.id).await.unwrap();
    assert!(report.applied.is_empty());
    assert!(matches!(report.rejected[0].error, EditorError::PlanDenied(_)));

    let session_state = h.service.accept(&p1, &OperationId::new("op-1")).await;
    assert!(matches!(
        session_state,
        Err(ServiceError::Editor(EditorError::InvalidTransition {
            from: OperationState::Rejected,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_publish_resolves_settings_against_plan() {
    let settings = SiteSettings {
        white_label: true,
        favicon_url: Some("/favicon.ico".into()),
        footer_text: Some("Family owned since 1982".into()),
    };

    let starter = harness(PlanTier::Starter, ScriptedAi::new(vec![]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    starter.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    starter.service.update_settings(&p1, settings.clone()).await.unwrap();

    let site = starter.service.publish(&p1).await.unwrap();
    let index = site.page("index.html").unwrap().html.as_str();
    assert!(index.contains("Built with Sitecraft"));
    assert!(!index.contains("Family owned since 1982"));
    assert!(!index.contains("rel=\"icon\""));

    let business = harness(PlanTier::Business, ScriptedAi::new(vec![]), ServiceConfig::default()).await;
    business.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    business.service.update_settings(&p1, settings).await.unwrap();

    let site = business.service.publish(&p1).await.unwrap();
    let index = site.page("index.html").unwrap().html.as_str();
    assert!(!index.contains("Built with Sitecraft"));
    assert!(index.contains("Family owned since 1982"));
    assert!(index.contains("<link rel=\"icon\" href=\"/favicon.ico\">"));
}

#[tokio::test]
async fn test_undo_is_saved() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![add_cta("op-1")]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    h.service.propose(&p1, &home(), "Add a call to action").await.unwrap();
    h.service.accept(&p1, &OperationId::new("op-1")).await.unwrap();

    let undone = h.service.undo(&p1).await.unwrap().unwrap();
    assert!(undone.project().pages[0].blocks.is_empty());

    let stored = h.store.load_project(&p1).await.unwrap().unwrap();
    assert!(stored.pages[0].blocks.is_empty());
    // Block ids stay unique after undo.
    assert_eq!(stored.block_sequence, 1);
}

#[tokio::test]
async fn test_unknown_project() {
    let h = harness(PlanTier::Starter, ScriptedAi::new(vec![]), ServiceConfig::default()).await;

    assert!(matches!(
        h.service.document(&ProjectId::new("missing")).await,
        Err(ServiceError::ProjectNotFound(_))
    ));
}

#[tokio::test]
async fn test_same_id_for_two_customers_is_created_once() {
    let store = Arc::new(RacingStore {
        inner: MemoryStore::new(),
        barrier: tokio::sync::Barrier::new(2),
    });
    let service = ProjectService::new(
        store.clone(),
        Arc::new(StaticDirectory::new(PlanTier::Pro)),
        Arc::new(ScriptedAi::new(vec![])),
        Arc::new(CreditLedger::new()),
        ServiceConfig::default(),
    );
    let alice = CustomerId::new("alice");
    let bob = CustomerId::new("bob");

    let (a, b) = tokio::join!(
        service.create_project(&alice, "shared", "Alice's Shop"),
        service.create_project(&bob, "shared", "Bob's Shop"),
    );

    let winner = match (a, b) {
        (Ok(_), Err(ServiceError::ProjectExists(_))) => alice,
        (Err(ServiceError::ProjectExists(_)), Ok(_)) => bob,
        other => panic!("Expected exactly one creation, got {other:?}"),
    };

    let stored = store.inner.load_project(&ProjectId::new("shared")).await.unwrap().unwrap();
    assert_eq!(stored.customer_id, winner);
    let document = service.document(&ProjectId::new("shared")).await.unwrap();
    assert_eq!(document.project().customer_id, winner);
}

#[tokio::test]
async fn test_dismiss_does_not_need_the_directory() {
    let directory = Arc::new(StallingDirectory {
        plan: PlanTier::Starter,
        stalled: AtomicBool::new(false),
    });
    let billing = Arc::new(CreditLedger::new());
    billing.top_up("c-1", 10_000).await;
    let config = ServiceConfig {
        directory_timeout: Duration::from_millis(20),
        ..ServiceConfig::default()
    };
    let service = ProjectService::new(
        Arc::new(MemoryStore::new()),
        directory.clone(),
        Arc::new(ScriptedAi::new(vec![add_cta("op-1"), add_cta("op-2")])),
        billing,
        config,
    );
    let p1 = ProjectId::new("p-1");
    service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    service.propose(&p1, &home(), "Add calls to action").await.unwrap();

    directory.stalled.store(true, Ordering::SeqCst);
    service.dismiss(&p1, &OperationId::new("op-1")).await.unwrap();

    // Applying still needs the plan.
    assert!(matches!(
        service.accept(&p1, &OperationId::new("op-2")).await,
        Err(ServiceError::Timeout {
            collaborator: "customer directory",
            ..
        })
    ));
}

#[tokio::test]
async fn test_sessions_are_released() {
    let h = harness(PlanTier::Pro, ScriptedAi::new(vec![add_cta("op-1")]), ServiceConfig::default()).await;
    let p1 = ProjectId::new("p-1");
    let p2 = ProjectId::new("p-2");
    h.service.create_project(&customer(), "p-1", "Acme").await.unwrap();
    h.service.create_project(&customer(), "p-2", "Other").await.unwrap();
    assert_eq!(h.service.open_sessions().await, 2);

    h.service.delete_project(&p2).await.unwrap();
    assert_eq!(h.service.open_sessions().await, 1);

    h.service.propose(&p1, &home(), "Add a call to action").await.unwrap();
    h.service.accept(&p1, &OperationId::new("op-1")).await.unwrap();
    assert!(h.service.close_session(&p1).await);
    assert_eq!(h.service.open_sessions().await, 0);

    // Reopened from the store with the applied block.
    let reopened = h.service.document(&p1).await.unwrap();
    assert_eq!(reopened.project().pages[0].blocks.len(), 1);
    assert!(matches!(
        h.service.document(&p2).await.map(|d| d.project().is_deleted()),
        Ok(true)
    ));
}
