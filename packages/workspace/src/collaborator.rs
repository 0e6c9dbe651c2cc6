//! Traits for the services a project depends on but does not own:
//! who the customer is paying for, where AI edits come from, and how
//! AI usage is billed.

use async_trait::async_trait;
use sitecraft_document::{Page, Project};
use sitecraft_editor::{Operation, TokenUsage};
use sitecraft_plans::PlanTier;
use sitecraft_schema::CustomerId;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Failure reported by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn plan_for(&self, customer: &CustomerId) -> Result<PlanTier, CollaboratorError>;
}

/// Plans assigned up front, with a fallback for everyone else
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    plans: HashMap<CustomerId, PlanTier>,
    fallback: PlanTier,
}

impl StaticDirectory {
    pub fn new(fallback: PlanTier) -> Self {
        Self {
            plans: HashMap::new(),
            fallback,
        }
    }

    pub fn with_customer(mut self, customer: impl Into<CustomerId>, plan: PlanTier) -> Self {
        self.plans.insert(customer.into(), plan);
        self
    }
}

#[async_trait]
impl CustomerDirectory for StaticDirectory {
    async fn plan_for(&self, customer: &CustomerId) -> Result<PlanTier, CollaboratorError> {
        Ok(self.plans.get(customer).copied().unwrap_or(self.fallback))
    }
}

/// Operations an AI provider suggests for one instruction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Proposal {
    pub operations: Vec<Operation>,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Suggest edits to `page`. The project is a read-only snapshot.
    async fn propose(&self, project: &Project, page: &Page, instruction: &str) -> Result<Proposal, CollaboratorError>;
}

/// Credit held for an AI call until its real cost is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hold {
    pub id: String,
    pub customer: CustomerId,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    Allowed(Hold),
    Denied { reason: String },
}

#[async_trait]
pub trait Billing: Send + Sync {
    /// Hold `estimated_cost` credits; a denied reservation means no AI call
    async fn reserve(&self, customer: &CustomerId, estimated_cost: u64) -> Result<Reservation, CollaboratorError>;

    /// Release the hold and charge what the call actually cost
    async fn settle(&self, hold: Hold, actual_cost: u64) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<CustomerId, u64>,
    holds: HashMap<String, u64>,
    next_hold: u64,
}

/// Prepaid credit balances kept in memory
#[derive(Debug, Default)]
pub struct CreditLedger {
    ledger: Mutex<Ledger>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn top_up(&self, customer: impl Into<CustomerId>, credits: u64) {
        let mut ledger = self.ledger.lock().await;
        let balance = ledger.balances.entry(customer.into()).or_default();
        *balance = balance.saturating_add(credits);
    }

    /// Spendable credits, excluding open holds
    pub async fn balance(&self, customer: &CustomerId) -> u64 {
        self.ledger
            .lock()
            .await
            .balances
            .get(customer)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Billing for CreditLedger {
    async fn reserve(&self, customer: &CustomerId, estimated_cost: u64) -> Result<Reservation, CollaboratorError> {
        let mut ledger = self.ledger.lock().await;
        let balance = ledger.balances.get(customer).copied().unwrap_or(0);
        if balance < estimated_cost {
            return Ok(Reservation::Denied {
                reason: format!("Not enough AI credits: {balance} left, {estimated_cost} needed"),
            });
        }

        ledger.balances.insert(customer.clone(), balance - estimated_cost);
        ledger.next_hold += 1;
        let id = format!("hold-{}", ledger.next_hold);
        ledger.holds.insert(id.clone(), estimated_cost);

        Ok(Reservation::Allowed(Hold {
            id,
            customer: customer.clone(),
            amount: estimated_cost,
        }))
    }

    async fn settle(&self, hold: Hold, actual_cost: u64) -> Result<(), CollaboratorError> {
        let mut ledger = self.ledger.lock().await;
        let held = ledger
            .holds
            .remove(&hold.id)
            .ok_or_else(|| CollaboratorError::new(format!("Unknown hold: {}", hold.id)))?;

        // Refund the hold, then charge what was used; an overrun may
        // take the balance to zero but never below.
        let balance = ledger.balances.entry(hold.customer).or_default();
        *balance = balance.saturating_add(held).saturating_sub(actual_cost);
        Ok(())
    }
}
