//! Subscription plans and plan enforcement.
//!
//! A payroll provider company runs on one of four plans. The ledger keeps
//! its subscription and decides whether it may add employees, generate
//! payslips or create invoices.
//!
//! # Example
//!
//! ```rust,ignore
//! use payflow::billing::{PlanTier, SubscriptionLedger};
//! use payflow::storage::FileKvStore;
//!
//! let store = FileKvStore::open("./data").await?;
//! let ledger = SubscriptionLedger::new(store);
//! ledger.hydrate().await?;
//!
//! if ledger.get_subscription(&company.id).await.is_none() {
//!     ledger.init_trial_subscription(&company.id).await?;
//! }
//!
//! let check = ledger.can_add_employee(&company.id).await;
//! if !check.allowed {
//!     println!("{} ({}/{})", check.reason.unwrap_or_default(), check.current_count, check.limit);
//! }
//! ```

pub mod audit;
pub mod ledger;
pub mod plans;
pub mod policy;
pub mod subscription;

pub use audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger, TracingAuditLogger};
pub use ledger::{SubscriptionLedger, DEFAULT_TRIAL_DAYS, SUBSCRIPTIONS_KEY};
pub use plans::{EmployeeLimit, LimitCheckResult, PlanConfig, PlanPrice, PlanTier};
pub use policy::{EmployeeCheck, PolicyCheck};
pub use subscription::{Subscription, SubscriptionStatus};

#[cfg(any(test, feature = "test-helpers"))]
pub use audit::test::RecordingAuditLogger;
