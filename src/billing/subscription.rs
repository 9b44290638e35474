//! Subscription record.
//!
//! One record per company. The ledger owns the lifecycle; this module only
//! defines the persisted shape and the read-only derivations on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plans::{PlanConfig, PlanTier};

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// Inside the free trial window.
    Trial,
    /// Trial or paid period ended without renewal.
    Expired,
    /// Cancelled by the company.
    Cancelled,
    /// Payment failed; still usable.
    PastDue,
}

impl SubscriptionStatus {
    /// Identifier used in persisted state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trial => "trial",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::PastDue => "past_due",
        }
    }

    /// Statuses that block every gated action regardless of plan.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A company's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Owning company (unique).
    pub company_id: String,
    /// Current plan.
    pub plan: PlanTier,
    /// Current status.
    pub status: SubscriptionStatus,
    /// Number of employees, maintained by the caller.
    ///
    /// Never recomputed from the roster: every roster mutation site must
    /// call `update_employee_count`.
    pub employee_count: u32,
    /// When the subscription started.
    pub start_date: DateTime<Utc>,
    /// When the subscription ended (cancellation).
    pub end_date: Option<DateTime<Utc>>,
    /// End of the trial window; only set while on the trial plan.
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Last (simulated) payment.
    pub last_payment_date: Option<DateTime<Utc>>,
    /// Next scheduled payment; none for trial and enterprise.
    pub next_payment_date: Option<DateTime<Utc>>,
}

impl Subscription {
    /// A fresh trial starting at `now` and lasting `trial_days`.
    #[must_use]
    pub fn trial(company_id: impl Into<String>, now: DateTime<Utc>, trial_days: u32) -> Self {
        Self {
            company_id: company_id.into(),
            plan: PlanTier::Trial,
            status: SubscriptionStatus::Trial,
            employee_count: 0,
            start_date: now,
            end_date: None,
            trial_ends_at: Some(now + chrono::Duration::days(i64::from(trial_days))),
            last_payment_date: None,
            next_payment_date: None,
        }
    }

    /// Static configuration of the current plan.
    #[must_use]
    pub fn plan_config(&self) -> &'static PlanConfig {
        self.plan.config()
    }

    /// Whether the trial window has passed at `now`.
    ///
    /// Derived, never stored: a trial past its window keeps `status = trial`.
    #[must_use]
    pub fn is_trial_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.is_some_and(|ends| ends < now)
    }

    #[must_use]
    pub fn is_trial(&self) -> bool {
        self.status == SubscriptionStatus::Trial
    }

    /// Whole days left in the current period at `now`.
    ///
    /// Trial: days until the trial ends. Otherwise days until the next
    /// payment, if one is scheduled. Partial days round up; past dates give 0.
    #[must_use]
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status == SubscriptionStatus::Trial {
            if let Some(ends) = self.trial_ends_at {
                return Some(ceil_days(ends - now));
            }
        }
        self.next_payment_date.map(|next| ceil_days(next - now))
    }
}

const MILLIS_PER_DAY: i64 = 86_400_000;

fn ceil_days(delta: chrono::Duration) -> i64 {
    let ms = delta.num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }
}
