//! Plans and Pricing Catalog
//!
//! The pricing section offers three tiers, each billed monthly or annually.
//! Picking a tier and cycle resolves an immutable [`Plan`] that opens the
//! checkout flow.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// A purchasable plan, resolved for one billing cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Display label (e.g. "Professional")
    pub name: String,

    /// Price per period, already resolved for the billing cycle
    pub price: Decimal,

    /// Display unit (e.g. "per month")
    pub period: String,
}

impl Plan {
    /// Create a plan, rejecting empty names and non-positive prices
    pub fn new(name: impl Into<String>, price: Decimal, period: impl Into<String>) -> Result<Self> {
        let plan = Self {
            name: name.into(),
            price,
            period: period.into(),
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Check the preconditions for opening a checkout with this plan
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CheckoutError::InvalidPlan("plan name is empty".into()));
        }
        if self.price <= Decimal::ZERO {
            return Err(CheckoutError::InvalidPlan(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (${} {})", self.name, self.price, self.period)
    }
}

/// Billing cycle toggle on the pricing section
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

impl BillingCycle {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Promotional badge shown next to the cycle
    pub const fn badge(&self) -> Option<&'static str> {
        match self {
            Self::Monthly => None,
            Self::Annual => Some("Save 20%"),
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "annual" | "yearly" => Ok(Self::Annual),
            _ => Err(CheckoutError::UnknownCycle(s.to_string())),
        }
    }
}

/// Subscription tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Professional,
    Enterprise,
}

impl PlanTier {
    pub const ALL: [Self; 3] = [Self::Starter, Self::Professional, Self::Enterprise];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Starter => "Starter",
            Self::Professional => "Professional",
            Self::Enterprise => "Enterprise",
        }
    }

    /// Monthly-equivalent price for a billing cycle
    pub fn price(&self, cycle: BillingCycle) -> Decimal {
        match (self, cycle) {
            (Self::Starter, BillingCycle::Monthly) => dec!(9),
            (Self::Starter, BillingCycle::Annual) => dec!(7),
            (Self::Professional, BillingCycle::Monthly) => dec!(29),
            (Self::Professional, BillingCycle::Annual) => dec!(23),
            (Self::Enterprise, BillingCycle::Monthly) => dec!(99),
            (Self::Enterprise, BillingCycle::Annual) => dec!(79),
        }
    }

    /// Highlighted as "Most Popular"
    pub const fn popular(&self) -> bool {
        matches!(self, Self::Professional)
    }

    /// Resolve the plan handed to the checkout flow
    pub fn plan(&self, cycle: BillingCycle) -> Plan {
        Plan {
            name: self.display_name().into(),
            price: self.price(cycle),
            period: "per month".into(),
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "starter" => Ok(Self::Starter),
            "professional" | "pro" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(CheckoutError::UnknownTier(s.to_string())),
        }
    }
}

/// One card on the pricing section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanOffer {
    pub tier: PlanTier,
    pub cycle: BillingCycle,
    pub plan: Plan,
    pub popular: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

/// Every tier priced for the given cycle, in display order
pub fn catalog(cycle: BillingCycle) -> Vec<PlanOffer> {
    PlanTier::ALL
        .into_iter()
        .map(|tier| PlanOffer {
            tier,
            cycle,
            plan: tier.plan(cycle),
            popular: tier.popular(),
            badge: cycle.badge().map(Into::into),
        })
        .collect()
}
