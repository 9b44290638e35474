//! Subscription ledger.
//!
//! Holds one [`Subscription`] per company, persists the whole map under
//! [`SUBSCRIPTIONS_KEY`] after every command and answers the gating
//! queries the app asks before adding employees, generating payslips or
//! creating invoices.
//!
//! ```rust,ignore
//! use payflow::billing::{PlanTier, SubscriptionLedger};
//! use payflow::storage::InMemoryKvStore;
//!
//! let ledger = SubscriptionLedger::new(InMemoryKvStore::new());
//! ledger.init_trial_subscription("company_a").await?;
//!
//! let check = ledger.can_add_employee("company_a").await;
//! assert!(check.allowed);
//!
//! ledger.upgrade_plan("company_a", PlanTier::Professional).await?;
//! ```

use std::collections::HashMap;

use chrono::Months;
use tokio::sync::RwLock;

use super::audit::{BillingAuditEvent, BillingAuditLogger, TracingAuditLogger};
use super::plans::{EmployeeLimit, PlanTier};
use super::policy::{
    limit_reached_reason, EmployeeCheck, PolicyCheck, REASON_CANCELLED, REASON_EXPIRED,
    REASON_NO_SUBSCRIPTION, REASON_TRIAL_EXPIRED,
};
use super::subscription::{Subscription, SubscriptionStatus};
use crate::clock::{Clock, SystemClock};
use crate::error::{PayflowError, Result};
use crate::traits::kv::{KeyValueStore, KeyValueStoreExt};

/// Storage key of the persisted subscription map.
pub const SUBSCRIPTIONS_KEY: &str = "payflow.subscriptions";

/// Length of a new trial.
pub const DEFAULT_TRIAL_DAYS: u32 = 14;

/// Per-company subscription state with plan enforcement.
pub struct SubscriptionLedger<S, C = SystemClock, A = TracingAuditLogger> {
    store: S,
    clock: C,
    audit: A,
    trial_days: u32,
    state: RwLock<HashMap<String, Subscription>>,
}

impl<S: KeyValueStore> SubscriptionLedger<S> {
    /// Create an empty ledger on the wall clock.
    ///
    /// Call [`hydrate`](Self::hydrate) to load previously persisted state.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
            audit: TracingAuditLogger,
            trial_days: DEFAULT_TRIAL_DAYS,
            state: RwLock::new(HashMap::new()),
        }
    }
}

impl<S, C, A> SubscriptionLedger<S, C, A>
where
    S: KeyValueStore,
    C: Clock,
    A: BillingAuditLogger,
{
    /// Replace the time source.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> SubscriptionLedger<S, C2, A> {
        SubscriptionLedger {
            store: self.store,
            clock,
            audit: self.audit,
            trial_days: self.trial_days,
            state: self.state,
        }
    }

    /// Replace the audit logger.
    #[must_use]
    pub fn with_audit_logger<A2: BillingAuditLogger>(self, audit: A2) -> SubscriptionLedger<S, C, A2> {
        SubscriptionLedger {
            store: self.store,
            clock: self.clock,
            audit,
            trial_days: self.trial_days,
            state: self.state,
        }
    }

    /// Override the trial length used by [`init_trial_subscription`](Self::init_trial_subscription).
    #[must_use]
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = days;
        self
    }

    /// Current time according to this ledger's clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub(crate) fn audit(&self) -> &A {
        &self.audit
    }

    /// Replace in-memory state with what is persisted.
    ///
    /// A missing key loads as an empty ledger. Returns the number of
    /// subscriptions loaded.
    pub async fn hydrate(&self) -> Result<usize> {
        let loaded: HashMap<String, Subscription> =
            self.store.get(SUBSCRIPTIONS_KEY).await?.unwrap_or_default();
        let count = loaded.len();
        *self.state.write().await = loaded;

        tracing::debug!(
            target: "payflow::billing",
            subscriptions = count,
            "Subscription ledger hydrated"
        );
        Ok(count)
    }

    /// Start a trial for `company_id`, replacing any existing record.
    pub async fn init_trial_subscription(&self, company_id: &str) -> Result<Subscription> {
        let sub = Subscription::trial(company_id, self.clock.now(), self.trial_days);
        self.put(sub.clone()).await?;

        tracing::info!(
            target: "payflow::billing",
            company_id = %company_id,
            trial_ends_at = ?sub.trial_ends_at,
            "Trial subscription started"
        );
        self.audit
            .log(BillingAuditEvent::TrialStarted {
                company_id: company_id.to_string(),
                trial_days: self.trial_days,
            })
            .await;
        Ok(sub)
    }

    /// Store `subscription` exactly as given.
    pub async fn set_subscription(&self, subscription: Subscription) -> Result<()> {
        let event = BillingAuditEvent::SubscriptionSet {
            company_id: subscription.company_id.clone(),
            plan: subscription.plan,
            status: subscription.status,
        };
        self.put(subscription).await?;
        self.audit.log(event).await;
        Ok(())
    }

    /// Move a company to `plan` as if payment succeeded.
    ///
    /// Clears the trial, marks the subscription active and schedules the
    /// next payment one calendar month out (none for enterprise).
    pub async fn upgrade_plan(&self, company_id: &str, plan: PlanTier) -> Result<Subscription> {
        let now = self.clock.now();
        let mut from = plan;
        let updated = self
            .update(company_id, |sub| {
                from = sub.plan;
                sub.plan = plan;
                sub.status = SubscriptionStatus::Active;
                sub.trial_ends_at = None;
                sub.last_payment_date = Some(now);
                sub.next_payment_date = if plan.has_recurring_payment() {
                    now.checked_add_months(Months::new(1))
                } else {
                    None
                };
            })
            .await?;

        tracing::info!(
            target: "payflow::billing",
            company_id = %company_id,
            from = %from,
            to = %plan,
            "Plan upgraded"
        );
        self.audit
            .log(BillingAuditEvent::PlanUpgraded {
                company_id: company_id.to_string(),
                from,
                to: plan,
            })
            .await;
        Ok(updated)
    }

    /// Cancel a company's subscription, effective now.
    pub async fn cancel_subscription(&self, company_id: &str) -> Result<Subscription> {
        let now = self.clock.now();
        let updated = self
            .update(company_id, |sub| {
                sub.status = SubscriptionStatus::Cancelled;
                sub.end_date = Some(now);
            })
            .await?;

        tracing::info!(
            target: "payflow::billing",
            company_id = %company_id,
            "Subscription cancelled"
        );
        self.audit
            .log(BillingAuditEvent::SubscriptionCancelled {
                company_id: company_id.to_string(),
            })
            .await;
        Ok(updated)
    }

    /// Record the company's current number of employees.
    pub async fn update_employee_count(&self, company_id: &str, count: u32) -> Result<Subscription> {
        let mut previous = count;
        let updated = self
            .update(company_id, |sub| {
                previous = sub.employee_count;
                sub.employee_count = count;
            })
            .await?;

        if previous != count {
            self.audit
                .log(BillingAuditEvent::EmployeeCountUpdated {
                    company_id: company_id.to_string(),
                    previous,
                    current: count,
                })
                .await;
        }
        Ok(updated)
    }

    /// Current subscription of `company_id`, if any.
    pub async fn get_subscription(&self, company_id: &str) -> Option<Subscription> {
        self.state.read().await.get(company_id).cloned()
    }

    /// Whether the company's trial window has passed.
    ///
    /// False when there is no subscription or no trial.
    pub async fn is_trial_expired(&self, company_id: &str) -> bool {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .get(company_id)
            .is_some_and(|sub| sub.is_trial_expired_at(now))
    }

    /// Check whether the company may register one more employee.
    pub async fn can_add_employee(&self, company_id: &str) -> EmployeeCheck {
        let now = self.clock.now();
        let state = self.state.read().await;
        let Some(sub) = state.get(company_id) else {
            return EmployeeCheck::from_policy(
                PolicyCheck::deny(REASON_NO_SUBSCRIPTION),
                0,
                PlanTier::Trial.config().employee_limit,
            );
        };

        let limit = sub.plan_config().employee_limit;
        let status_check = status_gate(sub, now);
        if !status_check.allowed {
            return EmployeeCheck::from_policy(status_check, sub.employee_count, limit);
        }

        let check = match limit {
            EmployeeLimit::Limited(max) if !limit.allows(sub.employee_count) => {
                PolicyCheck::deny(limit_reached_reason(max))
            }
            _ => PolicyCheck::allow(),
        };
        EmployeeCheck::from_policy(check, sub.employee_count, limit)
    }

    /// Check whether the company may generate payslips.
    pub async fn can_create_payslip(&self, company_id: &str) -> PolicyCheck {
        let now = self.clock.now();
        match self.state.read().await.get(company_id) {
            Some(sub) => status_gate(sub, now),
            None => PolicyCheck::deny(REASON_NO_SUBSCRIPTION),
        }
    }

    /// Check whether the company may create invoices.
    ///
    /// Same gate as payslips.
    pub async fn can_create_invoice(&self, company_id: &str) -> PolicyCheck {
        self.can_create_payslip(company_id).await
    }

    /// Whole days left in the trial, or until the next payment.
    pub async fn get_days_remaining(&self, company_id: &str) -> Option<i64> {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .get(company_id)
            .and_then(|sub| sub.days_remaining_at(now))
    }

    /// Number of subscriptions held.
    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.is_empty()
    }

    /// Drop every subscription and persist the empty ledger.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let empty: HashMap<String, Subscription> = HashMap::new();
        self.store.set(SUBSCRIPTIONS_KEY, &empty).await?;
        *state = empty;
        drop(state);

        tracing::debug!(target: "payflow::billing", "Subscription ledger cleared");
        self.audit.log(BillingAuditEvent::LedgerCleared).await;
        Ok(())
    }

    /// Insert or replace a record and persist.
    async fn put(&self, subscription: Subscription) -> Result<()> {
        let mut state = self.state.write().await;
        let company_id = subscription.company_id.clone();
        let previous = state.insert(company_id.clone(), subscription);
        if let Err(err) = self.store.set(SUBSCRIPTIONS_KEY, &*state).await {
            restore(&mut state, company_id, previous);
            return Err(err);
        }
        Ok(())
    }

    /// Copy the company's record, apply `apply`, replace and persist.
    async fn update<F>(&self, company_id: &str, apply: F) -> Result<Subscription>
    where
        F: FnOnce(&mut Subscription),
    {
        let mut state = self.state.write().await;
        let mut updated = state
            .get(company_id)
            .cloned()
            .ok_or_else(|| PayflowError::not_found(format!("Subscription for company {}", company_id)))?;
        apply(&mut updated);

        let previous = state.insert(company_id.to_string(), updated.clone());
        if let Err(err) = self.store.set(SUBSCRIPTIONS_KEY, &*state).await {
            restore(&mut state, company_id.to_string(), previous);
            return Err(err);
        }
        Ok(updated)
    }
}

/// Roll back an in-memory write after persistence failed.
fn restore(state: &mut HashMap<String, Subscription>, company_id: String, previous: Option<Subscription>) {
    tracing::warn!(
        target: "payflow::billing",
        company_id = %company_id,
        "Failed to persist subscription ledger, change rolled back"
    );
    match previous {
        Some(sub) => {
            state.insert(company_id, sub);
        }
        None => {
            state.remove(&company_id);
        }
    }
}

/// Existence is checked by the caller; this gates on status and trial window.
fn status_gate(sub: &Subscription, now: chrono::DateTime<chrono::Utc>) -> PolicyCheck {
    match sub.status {
        SubscriptionStatus::Cancelled => PolicyCheck::deny(REASON_CANCELLED),
        SubscriptionStatus::Expired => PolicyCheck::deny(REASON_EXPIRED),
        SubscriptionStatus::Trial if sub.is_trial_expired_at(now) => {
            PolicyCheck::deny(REASON_TRIAL_EXPIRED)
        }
        _ => PolicyCheck::allow(),
    }
}
