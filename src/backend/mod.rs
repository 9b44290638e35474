//! Relational data backend.
//!
//! Companies, employees, monthly variables, payslips, invoices and
//! invitations live in a relational store reached through
//! [`PayrollBackend`]. [`InMemoryBackend`] serves local-only mode and tests;
//! [`RestBackend`] talks to a PostgREST-style HTTP API.
//!
//! Rows are soft-deleted by stamping `deleted_at`. Calls are never retried
//! here; failures surface to the caller as returned.

mod in_memory;
pub mod models;
#[cfg(feature = "remote")]
mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::invoicing::{Invoice, InvoiceStatus};
use crate::payroll::{MonthlyVariables, Payslip, PayslipStatus};

pub use in_memory::InMemoryBackend;
pub use models::{Company, CompanyKind, Employee, Invitation, InvitationRole};
#[cfg(feature = "remote")]
pub use rest::RestBackend;

/// Storage operations the payroll core needs from the relational backend.
///
/// Lookups return `Ok(None)` for unknown ids. Updates and soft deletes of
/// unknown ids return [`PayflowError::NotFound`](crate::error::PayflowError::NotFound).
#[async_trait]
pub trait PayrollBackend: Send + Sync {
    // Companies

    async fn insert_company(&self, company: &Company) -> Result<()>;

    async fn get_company(&self, id: &str) -> Result<Option<Company>>;

    /// Active client companies of a provider.
    async fn list_clients(&self, provider_id: &str) -> Result<Vec<Company>>;

    async fn soft_delete_company(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()>;

    /// Write the snapshot back with `deleted_at` cleared.
    async fn restore_company(&self, company: &Company) -> Result<()>;

    // Employees

    async fn insert_employee(&self, employee: &Employee) -> Result<()>;

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>>;

    /// Active employees placed at a client company.
    async fn list_employees_for_client(&self, client_company_id: &str) -> Result<Vec<Employee>>;

    /// Active employees whose employer of record is `company_id`.
    async fn count_active_employees(&self, company_id: &str) -> Result<u32>;

    async fn soft_delete_employee(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()>;

    /// Write the snapshot back with `deleted_at` cleared.
    async fn restore_employee(&self, employee: &Employee) -> Result<()>;

    // Monthly variables

    /// Insert or replace.
    async fn save_variables(&self, variables: &MonthlyVariables) -> Result<()>;

    async fn get_variables(&self, id: &str) -> Result<Option<MonthlyVariables>>;

    // Payslips

    /// Insert a payslip. A second payslip for the same variables is a
    /// `BadRequest`.
    async fn insert_payslip(&self, payslip: &Payslip) -> Result<()>;

    async fn get_payslip(&self, id: &str) -> Result<Option<Payslip>>;

    async fn find_payslip_by_variables(&self, variables_id: &str) -> Result<Option<Payslip>>;

    /// Raw status write. Lifecycle rules are applied by the caller.
    async fn update_payslip_status(&self, id: &str, status: PayslipStatus) -> Result<()>;

    async fn list_payslips_for_employee(&self, employee_id: &str) -> Result<Vec<Payslip>>;

    // Invoices

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()>;

    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>>;

    /// Raw status write. Lifecycle rules are applied by the caller.
    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<()>;

    async fn list_invoices_for_client(&self, client_company_id: &str) -> Result<Vec<Invoice>>;

    // Invitations

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<()>;

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>>;

    /// Check if the backend is reachable
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Build the remote backend from configuration.
///
/// Returns `None` when the URL or key is missing, or the HTTP client cannot
/// be built. The app then runs on a local [`InMemoryBackend`].
#[cfg(feature = "remote")]
pub fn connect(config: &crate::config::BackendConfig) -> Option<RestBackend> {
    use secrecy::ExposeSecret;

    let (Some(url), Some(key)) = (config.url.as_deref(), config.key.as_ref()) else {
        tracing::info!(target: "payflow::backend", "Backend not configured, running local-only");
        return None;
    };
    if url.trim().is_empty() || key.expose_secret().trim().is_empty() {
        tracing::info!(target: "payflow::backend", "Backend not configured, running local-only");
        return None;
    }

    match RestBackend::new(url, key.clone(), config.timeout) {
        Ok(backend) => {
            tracing::info!(target: "payflow::backend", url = %url, "Connected to remote backend");
            Some(backend)
        }
        Err(err) => {
            tracing::warn!(
                target: "payflow::backend",
                error = %err,
                "Failed to set up remote backend, running local-only"
            );
            None
        }
    }
}

/// Backend selected by configuration.
///
/// The remote backend when [`connect`] succeeds, otherwise a fresh
/// [`InMemoryBackend`] (local-only mode).
pub fn open(config: &crate::config::BackendConfig) -> Arc<dyn PayrollBackend> {
    remote(config).unwrap_or_else(|| Arc::new(InMemoryBackend::new()) as Arc<dyn PayrollBackend>)
}

#[cfg(feature = "remote")]
fn remote(config: &crate::config::BackendConfig) -> Option<Arc<dyn PayrollBackend>> {
    connect(config).map(|backend| Arc::new(backend) as Arc<dyn PayrollBackend>)
}

#[cfg(not(feature = "remote"))]
fn remote(config: &crate::config::BackendConfig) -> Option<Arc<dyn PayrollBackend>> {
    if config.is_configured() {
        tracing::warn!(
            target: "payflow::backend",
            "Backend configured but the `remote` feature is disabled, running local-only"
        );
    }
    None
}

#[async_trait]
impl<T: PayrollBackend + ?Sized> PayrollBackend for Arc<T> {
    async fn insert_company(&self, company: &Company) -> Result<()> {
        (**self).insert_company(company).await
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        (**self).get_company(id).await
    }

    async fn list_clients(&self, provider_id: &str) -> Result<Vec<Company>> {
        (**self).list_clients(provider_id).await
    }

    async fn soft_delete_company(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        (**self).soft_delete_company(id, deleted_at).await
    }

    async fn restore_company(&self, company: &Company) -> Result<()> {
        (**self).restore_company(company).await
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<()> {
        (**self).insert_employee(employee).await
    }

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>> {
        (**self).get_employee(id).await
    }

    async fn list_employees_for_client(&self, client_company_id: &str) -> Result<Vec<Employee>> {
        (**self).list_employees_for_client(client_company_id).await
    }

    async fn count_active_employees(&self, company_id: &str) -> Result<u32> {
        (**self).count_active_employees(company_id).await
    }

    async fn soft_delete_employee(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        (**self).soft_delete_employee(id, deleted_at).await
    }

    async fn restore_employee(&self, employee: &Employee) -> Result<()> {
        (**self).restore_employee(employee).await
    }

    async fn save_variables(&self, variables: &MonthlyVariables) -> Result<()> {
        (**self).save_variables(variables).await
    }

    async fn get_variables(&self, id: &str) -> Result<Option<MonthlyVariables>> {
        (**self).get_variables(id).await
    }

    async fn insert_payslip(&self, payslip: &Payslip) -> Result<()> {
        (**self).insert_payslip(payslip).await
    }

    async fn get_payslip(&self, id: &str) -> Result<Option<Payslip>> {
        (**self).get_payslip(id).await
    }

    async fn find_payslip_by_variables(&self, variables_id: &str) -> Result<Option<Payslip>> {
        (**self).find_payslip_by_variables(variables_id).await
    }

    async fn update_payslip_status(&self, id: &str, status: PayslipStatus) -> Result<()> {
        (**self).update_payslip_status(id, status).await
    }

    async fn list_payslips_for_employee(&self, employee_id: &str) -> Result<Vec<Payslip>> {
        (**self).list_payslips_for_employee(employee_id).await
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        (**self).insert_invoice(invoice).await
    }

    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>> {
        (**self).get_invoice(id).await
    }

    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<()> {
        (**self).update_invoice_status(id, status).await
    }

    async fn list_invoices_for_client(&self, client_company_id: &str) -> Result<Vec<Invoice>> {
        (**self).list_invoices_for_client(client_company_id).await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<()> {
        (**self).insert_invitation(invitation).await
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>> {
        (**self).find_invitation_by_token(token).await
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}

#[cfg(all(test, feature = "remote"))]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use secrecy::SecretString;

    fn config(url: Option<&str>, key: Option<&str>) -> BackendConfig {
        BackendConfig {
            url: url.map(str::to_string),
            key: key.map(SecretString::from),
            ..BackendConfig::default()
        }
    }

    #[test]
    fn test_connect_needs_url_and_key() {
        assert!(connect(&config(None, None)).is_none());
        assert!(connect(&config(Some("https://db.example.com"), None)).is_none());
        assert!(connect(&config(None, Some("anon-key"))).is_none());
    }

    #[test]
    fn test_connect_treats_blank_credentials_as_missing() {
        assert!(connect(&config(Some("   "), Some("anon-key"))).is_none());
        assert!(connect(&config(Some("https://db.example.com"), Some("  "))).is_none());
    }

    #[test]
    fn test_connect_with_credentials() {
        let backend = connect(&config(Some("https://db.example.com/"), Some("anon-key"))).unwrap();
        assert_eq!(backend.base_url(), "https://db.example.com/rest/v1");
    }

    #[test]
    fn test_connect_rejects_bad_scheme() {
        assert!(connect(&config(Some("db.example.com"), Some("anon-key"))).is_none());
    }

    #[tokio::test]
    async fn test_open_falls_back_to_local() {
        let backend = open(&config(None, Some("anon-key")));
        let company = Company::provider("Provider A");
        backend.insert_company(&company).await.unwrap();
        assert_eq!(backend.get_company(&company.id).await.unwrap(), Some(company));
    }
}
