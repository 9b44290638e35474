//! Plan catalog.
//!
//! The four subscription tiers are compiled in. Every tier carries an
//! employee ceiling, a monthly price and an ordered feature list.
//!
//! ```rust
//! use payflow::billing::{EmployeeLimit, PlanTier};
//!
//! let trial = PlanTier::Trial.config();
//! assert_eq!(trial.employee_limit, EmployeeLimit::Limited(5));
//! assert!(PlanTier::Enterprise.config().employee_limit.is_unlimited());
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PayflowError;

/// Subscription plan identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// Free 14-day trial.
    Trial,
    /// Small payroll providers.
    Starter,
    /// Growing payroll providers.
    Professional,
    /// Unbounded, priced on quote.
    Enterprise,
}

impl PlanTier {
    /// All tiers in display order.
    #[must_use]
    pub fn all() -> [PlanTier; 4] {
        [Self::Trial, Self::Starter, Self::Professional, Self::Enterprise]
    }

    /// Static configuration for this tier.
    #[must_use]
    pub fn config(self) -> &'static PlanConfig {
        get(self)
    }

    /// Identifier used in persisted state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    /// Whether subscribing to this tier schedules recurring payments.
    #[must_use]
    pub fn has_recurring_payment(&self) -> bool {
        !matches!(self, Self::Trial | Self::Enterprise)
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = PayflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(Self::Trial),
            "starter" => Ok(Self::Starter),
            "professional" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(PayflowError::bad_request(format!("Unknown plan: {}", other))),
        }
    }
}

/// Employee ceiling of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeLimit {
    /// At most this many employees.
    Limited(u32),
    /// No ceiling.
    Unlimited,
}

impl EmployeeLimit {
    /// Whether one more employee fits when `current` are already registered.
    #[must_use]
    pub fn allows(&self, current: u32) -> bool {
        match self {
            Self::Limited(max) => current < *max,
            Self::Unlimited => true,
        }
    }

    /// The numeric ceiling, if any.
    #[must_use]
    pub fn max(&self) -> Option<u32> {
        match self {
            Self::Limited(max) => Some(*max),
            Self::Unlimited => None,
        }
    }

    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl fmt::Display for EmployeeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(max) => write!(f, "{}", max),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Monthly price of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPrice {
    /// Fixed monthly price in euros.
    Monthly(Decimal),
    /// Price negotiated per customer.
    QuoteRequired,
}

impl PlanPrice {
    /// Numeric form where `-1` stands for "quote required".
    #[must_use]
    pub fn as_sentinel(&self) -> Decimal {
        match self {
            Self::Monthly(amount) => *amount,
            Self::QuoteRequired => dec!(-1),
        }
    }

    /// Inverse of [`PlanPrice::as_sentinel`]: any negative amount means "on quote".
    #[must_use]
    pub fn from_sentinel(amount: Decimal) -> Self {
        if amount.is_sign_negative() {
            Self::QuoteRequired
        } else {
            Self::Monthly(amount)
        }
    }
}

impl fmt::Display for PlanPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly(amount) => write!(f, "{} €/month", amount),
            Self::QuoteRequired => write!(f, "on quote"),
        }
    }
}

/// Configuration for a single plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    /// Tier this configuration describes.
    pub tier: PlanTier,
    /// Name shown to users.
    pub display_name: &'static str,
    /// Monthly price.
    pub monthly_price: PlanPrice,
    /// Maximum number of employees.
    pub employee_limit: EmployeeLimit,
    /// Features available on this plan, in display order.
    pub features: &'static [&'static str],
}

impl PlanConfig {
    /// Check if this plan has a specific feature.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(&feature)
    }

    /// Check whether one more employee fits under this plan's ceiling.
    #[must_use]
    pub fn check_limit(&self, current: u32) -> LimitCheckResult {
        match self.employee_limit {
            EmployeeLimit::Unlimited => LimitCheckResult::Unlimited,
            EmployeeLimit::Limited(max) if current < max => {
                LimitCheckResult::WithinLimit { current, max }
            }
            EmployeeLimit::Limited(max) => LimitCheckResult::AtLimit { current, max },
        }
    }
}

/// Result of checking the employee ceiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LimitCheckResult {
    /// No limit on this plan.
    Unlimited,
    /// Usage is within the limit.
    WithinLimit { current: u32, max: u32 },
    /// Usage has reached or exceeded the limit.
    AtLimit { current: u32, max: u32 },
}

impl LimitCheckResult {
    /// Check if usage is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Unlimited | Self::WithinLimit { .. })
    }

    /// Check if at or over limit.
    #[must_use]
    pub fn is_at_limit(&self) -> bool {
        matches!(self, Self::AtLimit { .. })
    }
}

static TRIAL: PlanConfig = PlanConfig {
    tier: PlanTier::Trial,
    display_name: "Trial",
    monthly_price: PlanPrice::Monthly(Decimal::ZERO),
    employee_limit: EmployeeLimit::Limited(5),
    features: &[
        "Up to 5 employees",
        "Payslip generation",
        "Monthly variables entry",
        "Email support",
    ],
};

static STARTER: PlanConfig = PlanConfig {
    tier: PlanTier::Starter,
    display_name: "Starter",
    monthly_price: PlanPrice::Monthly(dec!(49)),
    employee_limit: EmployeeLimit::Limited(20),
    features: &[
        "Up to 20 employees",
        "Payslip generation",
        "Monthly variables entry",
        "Client invoicing",
        "Email support",
    ],
};

static PROFESSIONAL: PlanConfig = PlanConfig {
    tier: PlanTier::Professional,
    display_name: "Professional",
    monthly_price: PlanPrice::Monthly(dec!(99)),
    employee_limit: EmployeeLimit::Limited(100),
    features: &[
        "Up to 100 employees",
        "Payslip generation",
        "Monthly variables entry",
        "Client invoicing",
        "Deletion history and restore",
        "Priority support",
    ],
};

static ENTERPRISE: PlanConfig = PlanConfig {
    tier: PlanTier::Enterprise,
    display_name: "Enterprise",
    monthly_price: PlanPrice::QuoteRequired,
    employee_limit: EmployeeLimit::Unlimited,
    features: &[
        "Unlimited employees",
        "Payslip generation",
        "Monthly variables entry",
        "Client invoicing",
        "Deletion history and restore",
        "Dedicated account manager",
    ],
};

/// Look up the configuration of a tier.
#[must_use]
pub fn get(tier: PlanTier) -> &'static PlanConfig {
    match tier {
        PlanTier::Trial => &TRIAL,
        PlanTier::Starter => &STARTER,
        PlanTier::Professional => &PROFESSIONAL,
        PlanTier::Enterprise => &ENTERPRISE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_strictly_increase() {
        let trial = PlanTier::Trial.config().employee_limit.max().unwrap();
        let starter = PlanTier::Starter.config().employee_limit.max().unwrap();
        let pro = PlanTier::Professional.config().employee_limit.max().unwrap();

        assert!(trial < starter);
        assert!(starter < pro);
        assert!(PlanTier::Enterprise.config().employee_limit.is_unlimited());
    }

    #[test]
    fn test_trial_values() {
        let trial = PlanTier::Trial.config();
        assert_eq!(trial.employee_limit, EmployeeLimit::Limited(5));
        assert_eq!(trial.monthly_price, PlanPrice::Monthly(Decimal::ZERO));
        assert_eq!(trial.tier, PlanTier::Trial);
    }

    #[test]
    fn test_enterprise_quote_sentinel() {
        let enterprise = PlanTier::Enterprise.config();
        assert_eq!(enterprise.monthly_price.as_sentinel(), dec!(-1));
        assert_eq!(PlanPrice::from_sentinel(dec!(-1)), PlanPrice::QuoteRequired);
        assert_eq!(PlanPrice::from_sentinel(dec!(49)), PlanPrice::Monthly(dec!(49)));
    }

    #[test]
    fn test_limit_boundaries() {
        let trial = PlanTier::Trial.config();
        assert!(trial.check_limit(4).is_allowed());
        assert!(trial.check_limit(5).is_at_limit());
        assert_eq!(
            trial.check_limit(3),
            LimitCheckResult::WithinLimit { current: 3, max: 5 }
        );
        assert_eq!(
            PlanTier::Enterprise.config().check_limit(10_000),
            LimitCheckResult::Unlimited
        );
    }

    #[test]
    fn test_features_are_ordered_and_queryable() {
        let pro = PlanTier::Professional.config();
        assert_eq!(pro.features[0], "Up to 100 employees");
        assert!(pro.has_feature("Client invoicing"));
        assert!(!PlanTier::Trial.config().has_feature("Client invoicing"));
    }

    #[test]
    fn test_parse_and_display() {
        for tier in PlanTier::all() {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);
            assert_eq!(tier.to_string(), tier.as_str());
        }
        assert_eq!(" Starter ".parse::<PlanTier>().unwrap(), PlanTier::Starter);
        assert!("platinum".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_serde_ids() {
        assert_eq!(serde_json::to_string(&PlanTier::Professional).unwrap(), "\"professional\"");
        let tier: PlanTier = serde_json::from_str("\"enterprise\"").unwrap();
        assert_eq!(tier, PlanTier::Enterprise);
    }

    #[test]
    fn test_recurring_payment() {
        assert!(!PlanTier::Trial.has_recurring_payment());
        assert!(PlanTier::Starter.has_recurring_payment());
        assert!(PlanTier::Professional.has_recurring_payment());
        assert!(!PlanTier::Enterprise.has_recurring_payment());
    }
}
