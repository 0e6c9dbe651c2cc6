//! Subscription tiers and what each one allows.

use crate::errors::GateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Pro,
    Business,
}

impl PlanTier {
    /// Cheapest first
    pub const ALL: [PlanTier; 3] = [PlanTier::Starter, PlanTier::Pro, PlanTier::Business];

    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Business => "business",
        }
    }
}

impl FromStr for PlanTier {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| GateError::UnknownPlan(s.to_string()))
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities a plan can switch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    CustomCode,
    WhiteLabel,
    Ecommerce,
    CustomFavicon,
    CustomFooter,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::CustomCode,
        Feature::WhiteLabel,
        Feature::Ecommerce,
        Feature::CustomFavicon,
        Feature::CustomFooter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::CustomCode => "custom-code",
            Feature::WhiteLabel => "white-label",
            Feature::Ecommerce => "ecommerce",
            Feature::CustomFavicon => "custom-favicon",
            Feature::CustomFooter => "custom-footer",
        }
    }
}

impl FromStr for Feature {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| GateError::UnknownFeature(s.to_string()))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits of one tier. `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlanLimits {
    #[serde(default)]
    pub max_sites: Option<u32>,
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub features: BTreeSet<Feature>,
}

impl PlanLimits {
    pub fn allows(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn allows_sites(&self, count: u32) -> bool {
        self.max_sites.map_or(true, |max| count <= max)
    }

    pub fn allows_pages(&self, count: u32) -> bool {
        self.max_pages.map_or(true, |max| count <= max)
    }
}

/// Tier → limits table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlanCatalog {
    pub starter: PlanLimits,
    pub pro: PlanLimits,
    pub business: PlanLimits,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self {
            starter: PlanLimits {
                max_sites: Some(1),
                max_pages: Some(5),
                features: BTreeSet::new(),
            },
            pro: PlanLimits {
                max_sites: Some(5),
                max_pages: Some(25),
                features: [Feature::WhiteLabel, Feature::CustomCode].into_iter().collect(),
            },
            business: PlanLimits {
                max_sites: None,
                max_pages: Some(100),
                features: Feature::ALL.into_iter().collect(),
            },
        }
    }
}

impl PlanCatalog {
    pub fn limits(&self, tier: PlanTier) -> &PlanLimits {
        match tier {
            PlanTier::Starter => &self.starter,
            PlanTier::Pro => &self.pro,
            PlanTier::Business => &self.business,
        }
    }

    /// Cheapest tier above `current` whose limits satisfy `fits`
    pub fn upgrade_for(&self, current: PlanTier, fits: impl Fn(&PlanLimits) -> bool) -> Option<PlanTier> {
        PlanTier::ALL
            .into_iter()
            .filter(|tier| *tier > current)
            .find(|tier| fits(self.limits(*tier)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = PlanCatalog::default();

        assert_eq!(catalog.limits(PlanTier::Starter).max_sites, Some(1));
        assert_eq!(catalog.limits(PlanTier::Starter).max_pages, Some(5));
        assert!(Feature::ALL.iter().all(|f| !catalog.starter.allows(*f)));

        assert!(catalog.pro.allows(Feature::WhiteLabel));
        assert!(catalog.pro.allows(Feature::CustomCode));
        assert!(!catalog.pro.allows(Feature::Ecommerce));

        assert!(catalog.business.allows_sites(10_000));
        assert!(!catalog.business.allows_pages(101));
        assert!(Feature::ALL.iter().all(|f| catalog.business.allows(*f)));
    }

    #[test]
    fn test_upgrade_for() {
        let catalog = PlanCatalog::default();
        assert_eq!(
            catalog.upgrade_for(PlanTier::Starter, |l| l.allows(Feature::CustomCode)),
            Some(PlanTier::Pro)
        );
        assert_eq!(
            catalog.upgrade_for(PlanTier::Starter, |l| l.allows(Feature::Ecommerce)),
            Some(PlanTier::Business)
        );
        assert_eq!(catalog.upgrade_for(PlanTier::Business, |_| true), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Feature::CustomFavicon).unwrap(), "\"custom-favicon\"");
        assert_eq!("white-label".parse::<Feature>().unwrap(), Feature::WhiteLabel);
        assert_eq!("pro".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert!(matches!("gold".parse::<PlanTier>(), Err(GateError::UnknownPlan(_))));
    }

    #[test]
    fn test_custom_catalog_json() {
        let json = r#"{
            "starter": { "maxSites": 2, "maxPages": 3 },
            "pro": { "maxSites": 10, "features": ["ecommerce"] },
            "business": {}
        }"#;
        let catalog: PlanCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.starter.max_sites, Some(2));
        assert_eq!(catalog.pro.max_pages, None);
        assert!(catalog.pro.allows(Feature::Ecommerce));
    }
}
