//! Plan enforcement: pure predicates over a catalog and current usage.

use crate::errors::GateError;
use crate::plan::{Feature, PlanCatalog, PlanTier};
use sitecraft_document::SiteSettings;
use sitecraft_schema::{CustomerId, ProjectId};
use std::collections::BTreeMap;
use std::fmt;

/// Why a change was refused, with an upgrade hint for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: String,
    pub upgrade_to: Option<PlanTier>,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

/// Where the gate reads current usage from.
///
/// Implementations hand back values fetched for the current call; the gate
/// keeps nothing between calls.
pub trait UsageSource {
    fn plan(&self, customer: &CustomerId) -> Result<PlanTier, GateError>;
    fn site_count(&self, customer: &CustomerId) -> Result<u32, GateError>;
    fn page_count(&self, project: &ProjectId) -> Result<u32, GateError>;
}

/// Contract the editor and services check structural changes against
pub trait Gate {
    /// May `customer` create one more site?
    fn check_site_limit(&self, customer: &CustomerId) -> Result<Decision, GateError>;

    /// May `customer` add one more page to `project`?
    fn check_page_limit(&self, customer: &CustomerId, project: &ProjectId) -> Result<Decision, GateError>;

    fn check_feature_gate(&self, customer: &CustomerId, feature: Feature) -> Result<Decision, GateError>;
}

/// [`Gate`] backed by a [`PlanCatalog`]
pub struct PlanGate<'a, U: UsageSource> {
    catalog: &'a PlanCatalog,
    usage: &'a U,
}

impl<'a, U: UsageSource> PlanGate<'a, U> {
    pub fn new(catalog: &'a PlanCatalog, usage: &'a U) -> Self {
        Self { catalog, usage }
    }
}

impl<U: UsageSource> Gate for PlanGate<'_, U> {
    fn check_site_limit(&self, customer: &CustomerId) -> Result<Decision, GateError> {
        let tier = self.usage.plan(customer)?;
        let sites = self.usage.site_count(customer)?;
        let limits = self.catalog.limits(tier);

        if limits.allows_sites(sites.saturating_add(1)) {
            return Ok(Decision::Allowed);
        }

        let max = limits.max_sites.unwrap_or_default();
        let upgrade_to = self.catalog.upgrade_for(tier, |l| l.allows_sites(sites.saturating_add(1)));
        let reason = format!(
            "Your {tier} plan allows {}; you already have {sites}.{}",
            plural(max, "site"),
            upgrade_hint(upgrade_to, "create more sites")
        );

        tracing::debug!(customer = %customer, %tier, sites, max, "site limit reached");
        Ok(Decision::Denied(Denial { reason, upgrade_to }))
    }

    fn check_page_limit(&self, customer: &CustomerId, project: &ProjectId) -> Result<Decision, GateError> {
        let tier = self.usage.plan(customer)?;
        let pages = self.usage.page_count(project)?;
        let limits = self.catalog.limits(tier);

        if limits.allows_pages(pages.saturating_add(1)) {
            return Ok(Decision::Allowed);
        }

        let max = limits.max_pages.unwrap_or_default();
        let upgrade_to = self.catalog.upgrade_for(tier, |l| l.allows_pages(pages.saturating_add(1)));
        let reason = format!(
            "Your {tier} plan allows {} per site; this site already has {pages}.{}",
            plural(max, "page"),
            upgrade_hint(upgrade_to, "add more pages")
        );

        tracing::debug!(customer = %customer, project = %project, %tier, pages, max, "page limit reached");
        Ok(Decision::Denied(Denial { reason, upgrade_to }))
    }

    fn check_feature_gate(&self, customer: &CustomerId, feature: Feature) -> Result<Decision, GateError> {
        let tier = self.usage.plan(customer)?;

        if self.catalog.limits(tier).allows(feature) {
            return Ok(Decision::Allowed);
        }

        let upgrade_to = self.catalog.upgrade_for(tier, |l| l.allows(feature));
        let reason = format!(
            "The {feature} feature is not included in the {tier} plan.{}",
            upgrade_hint(upgrade_to, "use it")
        );

        tracing::debug!(customer = %customer, %tier, %feature, "feature not in plan");
        Ok(Decision::Denied(Denial { reason, upgrade_to }))
    }
}

fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn upgrade_hint(tier: Option<PlanTier>, action: &str) -> String {
    match tier {
        Some(tier) => format!(" Upgrade to {tier} to {action}."),
        None => " Contact support to raise the limit.".to_string(),
    }
}

/// Usage of one customer, fetched for a single check-then-apply unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub customer: CustomerId,
    pub plan: PlanTier,
    pub site_count: u32,
    pub page_counts: BTreeMap<ProjectId, u32>,
}

impl UsageSnapshot {
    pub fn new(customer: impl Into<CustomerId>, plan: PlanTier, site_count: u32) -> Self {
        Self {
            customer: customer.into(),
            plan,
            site_count,
            page_counts: BTreeMap::new(),
        }
    }

    pub fn with_pages(mut self, project: impl Into<ProjectId>, pages: u32) -> Self {
        self.page_counts.insert(project.into(), pages);
        self
    }

    fn ensure_customer(&self, customer: &CustomerId) -> Result<(), GateError> {
        if &self.customer == customer {
            Ok(())
        } else {
            Err(GateError::UnknownCustomer(customer.clone()))
        }
    }
}

impl UsageSource for UsageSnapshot {
    fn plan(&self, customer: &CustomerId) -> Result<PlanTier, GateError> {
        self.ensure_customer(customer)?;
        Ok(self.plan)
    }

    fn site_count(&self, customer: &CustomerId) -> Result<u32, GateError> {
        self.ensure_customer(customer)?;
        Ok(self.site_count)
    }

    fn page_count(&self, project: &ProjectId) -> Result<u32, GateError> {
        self.page_counts
            .get(project)
            .copied()
            .ok_or_else(|| GateError::UnknownProject(project.clone()))
    }
}

/// Settings as the renderer may trust them: anything the customer's plan
/// does not include is switched off
pub fn resolve_settings(
    settings: &SiteSettings,
    customer: &CustomerId,
    gate: &dyn Gate,
) -> Result<SiteSettings, GateError> {
    let allowed = |feature| -> Result<bool, GateError> {
        Ok(gate.check_feature_gate(customer, feature)?.is_allowed())
    };

    let mut resolved = SiteSettings::default();

    if settings.white_label {
        resolved.white_label = allowed(Feature::WhiteLabel)?;
    }
    if settings.favicon_url.is_some() && allowed(Feature::CustomFavicon)? {
        resolved.favicon_url = settings.favicon_url.clone();
    }
    if settings.footer_text.is_some() && allowed(Feature::CustomFooter)? {
        resolved.footer_text = settings.footer_text.clone();
    }

    if &resolved != settings {
        tracing::debug!(customer = %customer, "settings outside the plan were dropped");
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerId {
        CustomerId::new("cust-1")
    }

    #[test]
    fn test_decision_into_result() {
        assert_eq!(Decision::Allowed.into_result(), Ok(()));

        let denial = Denial {
            reason: "no".into(),
            upgrade_to: None,
        };
        assert_eq!(Decision::Denied(denial.clone()).into_result(), Err(denial));
    }

    #[test]
    fn test_page_limit() {
        let catalog = PlanCatalog::default();
        let usage = UsageSnapshot::new("cust-1", PlanTier::Starter, 1)
            .with_pages("full", 5)
            .with_pages("room", 4);
        let gate = PlanGate::new(&catalog, &usage);

        assert_eq!(
            gate.check_page_limit(&customer(), &ProjectId::new("room")),
            Ok(Decision::Allowed)
        );

        match gate.check_page_limit(&customer(), &ProjectId::new("full")).unwrap() {
            Decision::Denied(denial) => {
                assert!(denial.reason.contains("5 pages"));
                assert_eq!(denial.upgrade_to, Some(PlanTier::Pro));
            }
            Decision::Allowed => panic!("Expected page limit denial"),
        }

        assert_eq!(
            gate.check_page_limit(&customer(), &ProjectId::new("other")),
            Err(GateError::UnknownProject(ProjectId::new("other")))
        );
    }

    #[test]
    fn test_counts_at_u32_max() {
        let catalog = PlanCatalog::default();

        let starter = UsageSnapshot::new("cust-1", PlanTier::Starter, u32::MAX);
        let gate = PlanGate::new(&catalog, &starter);
        assert!(!gate.check_site_limit(&customer()).unwrap().is_allowed());

        let business = UsageSnapshot::new("cust-1", PlanTier::Business, u32::MAX).with_pages("big", u32::MAX);
        let gate = PlanGate::new(&catalog, &business);
        assert!(gate.check_site_limit(&customer()).unwrap().is_allowed());

        match gate.check_page_limit(&customer(), &ProjectId::new("big")).unwrap() {
            Decision::Denied(denial) => {
                assert_eq!(denial.upgrade_to, None);
                assert!(denial.reason.contains("Contact support"));
            }
            Decision::Allowed => panic!("Expected page limit denial"),
        }
    }

    #[test]
    fn test_feature_gate() {
        let catalog = PlanCatalog::default();
        let usage = UsageSnapshot::new("cust-1", PlanTier::Pro, 1);
        let gate = PlanGate::new(&catalog, &usage);

        assert!(gate
            .check_feature_gate(&customer(), Feature::CustomCode)
            .unwrap()
            .is_allowed());

        match gate.check_feature_gate(&customer(), Feature::Ecommerce).unwrap() {
            Decision::Denied(denial) => {
                assert!(denial.reason.contains("ecommerce"));
                assert!(denial.reason.contains("Upgrade to business"));
            }
            Decision::Allowed => panic!("Expected feature denial"),
        }
    }

    #[test]
    fn test_unknown_customer() {
        let catalog = PlanCatalog::default();
        let usage = UsageSnapshot::new("cust-1", PlanTier::Pro, 1);
        let gate = PlanGate::new(&catalog, &usage);

        let result = gate.check_site_limit(&CustomerId::new("someone-else"));
        assert!(matches!(result, Err(GateError::UnknownCustomer(_))));
    }

    #[test]
    fn test_resolve_settings() {
        let catalog = PlanCatalog::default();
        let settings = SiteSettings {
            white_label: true,
            favicon_url: Some("/favicon.png".into()),
            footer_text: Some("© Acme".into()),
        };

        let pro = UsageSnapshot::new("cust-1", PlanTier::Pro, 1);
        let resolved = resolve_settings(&settings, &customer(), &PlanGate::new(&catalog, &pro)).unwrap();
        assert!(resolved.white_label);
        assert_eq!(resolved.favicon_url, None);
        assert_eq!(resolved.footer_text, None);

        let business = UsageSnapshot::new("cust-1", PlanTier::Business, 1);
        let resolved = resolve_settings(&settings, &customer(), &PlanGate::new(&catalog, &business)).unwrap();
        assert_eq!(resolved, settings);
    }
}
