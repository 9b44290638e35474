//! PayFlow - payroll core for umbrella payroll providers
//!
//! PayFlow covers the business rules behind a payroll-provider app: the
//! provider employs the staff, places them at client companies, produces
//! payslips from monthly variables and invoices the clients.
//!
//! # Features
//!
//! - **Billing**: plan catalog, per-company subscriptions, trial windows and
//!   plan-gated actions ([`billing`])
//! - **Payroll**: gross/net salary with French employee contributions
//!   ([`payroll`])
//! - **Invoicing**: roster-based invoice amounts and `FAC-YYYY-NNNN` numbers
//!   ([`invoicing`])
//! - **Deletion history**: soft-delete snapshots that can be restored
//!   ([`deletion`])
//! - **Backends**: in-memory or PostgREST-style HTTP ([`backend`])
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use payflow::backend::{Company, InMemoryBackend};
//! use payflow::storage::InMemoryKvStore;
//! use payflow::{ConfigBuilder, PayrollService};
//!
//! #[tokio::main]
//! async fn main() -> payflow::Result<()> {
//!     payflow::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let service = PayrollService::from_config(
//!         InMemoryBackend::new(),
//!         InMemoryKvStore::new(),
//!         &config.payroll,
//!     );
//!     service.hydrate().await?;
//!
//!     let provider = Company::provider("Provider A");
//!     let subscription = service.register_provider(&provider).await?;
//!     println!("{} days of trial left", subscription.days_remaining_at(chrono::Utc::now()).unwrap_or(0));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod billing;
pub mod clock;
mod config;
pub mod deletion;
mod error;
pub mod invoicing;
pub mod payroll;
pub mod service;
pub mod storage;
pub mod traits;
mod utils;

// Re-exports for public API
pub use billing::{
    BillingAuditEvent, BillingAuditLogger, EmployeeCheck, PlanTier, PolicyCheck, Subscription,
    SubscriptionLedger, SubscriptionStatus,
};
pub use clock::{Clock, SystemClock};
pub use config::{
    BackendConfig, Config, ConfigBuilder, InvoiceNumbering, LoggingConfig, PayrollConfig,
    StorageConfig,
};
pub use deletion::{DeletedEntityType, DeletionLedger, DeletionRecord};
pub use error::{PayflowError, Result};
pub use service::PayrollService;
pub use traits::{KeyValueStore, KeyValueStoreExt};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "payflow=debug")
/// - `PAYFLOW_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PAYFLOW_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install(env_filter, json_logs);
}

/// Initialize tracing from a built [`Config`]
pub fn init_tracing_with_config(config: &Config) {
    install(EnvFilter::new(&config.logging.level), config.logging.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(err) = result {
        eprintln!("payflow: tracing already initialized: {}", err);
    }
}
