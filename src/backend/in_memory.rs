use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{Company, CompanyKind, Employee, Invitation};
use super::PayrollBackend;
use crate::error::{PayflowError, Result};
use crate::invoicing::{Invoice, InvoiceStatus};
use crate::payroll::{MonthlyVariables, Payslip, PayslipStatus};

#[derive(Default)]
struct Tables {
    companies: HashMap<String, Company>,
    employees: HashMap<String, Employee>,
    variables: HashMap<String, MonthlyVariables>,
    payslips: HashMap<String, Payslip>,
    invoices: HashMap<String, Invoice>,
    invitations: HashMap<String, Invitation>,
}

/// Backend held in process memory.
///
/// Used when no remote backend is configured, and in tests. Clones share
/// the same tables.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_new<T>(table: &mut HashMap<String, T>, id: &str, row: T, kind: &str) -> Result<()> {
    if table.contains_key(id) {
        return Err(PayflowError::bad_request(format!("{} {} already exists", kind, id)));
    }
    table.insert(id.to_string(), row);
    Ok(())
}

fn not_found(kind: &str, id: &str) -> PayflowError {
    PayflowError::not_found(format!("{} {}", kind, id))
}

#[async_trait]
impl PayrollBackend for InMemoryBackend {
    async fn insert_company(&self, company: &Company) -> Result<()> {
        let mut tables = self.tables.write().await;
        insert_new(&mut tables.companies, &company.id, company.clone(), "Company")
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        Ok(self.tables.read().await.companies.get(id).cloned())
    }

    async fn list_clients(&self, provider_id: &str) -> Result<Vec<Company>> {
        let tables = self.tables.read().await;
        let mut clients: Vec<Company> = tables
            .companies
            .values()
            .filter(|c| c.kind == CompanyKind::Client && !c.is_deleted())
            .filter(|c| c.provider_id.as_deref() == Some(provider_id))
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn soft_delete_company(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let company = tables.companies.get_mut(id).ok_or_else(|| not_found("Company", id))?;
        company.deleted_at = Some(deleted_at);
        Ok(())
    }

    async fn restore_company(&self, company: &Company) -> Result<()> {
        let mut restored = company.clone();
        restored.deleted_at = None;
        self.tables.write().await.companies.insert(restored.id.clone(), restored);
        Ok(())
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<()> {
        let mut tables = self.tables.write().await;
        insert_new(&mut tables.employees, &employee.id, employee.clone(), "Employee")
    }

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>> {
        Ok(self.tables.read().await.employees.get(id).cloned())
    }

    async fn list_employees_for_client(&self, client_company_id: &str) -> Result<Vec<Employee>> {
        let tables = self.tables.read().await;
        let mut employees: Vec<Employee> = tables
            .employees
            .values()
            .filter(|e| !e.is_deleted())
            .filter(|e| e.client_company_id.as_deref() == Some(client_company_id))
            .cloned()
            .collect();
        employees.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(employees)
    }

    async fn count_active_employees(&self, company_id: &str) -> Result<u32> {
        let tables = self.tables.read().await;
        let count = tables
            .employees
            .values()
            .filter(|e| e.company_id == company_id && !e.is_deleted())
            .count();
        u32::try_from(count).map_err(|_| PayflowError::internal("Employee count overflow"))
    }

    async fn soft_delete_employee(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let employee = tables.employees.get_mut(id).ok_or_else(|| not_found("Employee", id))?;
        employee.deleted_at = Some(deleted_at);
        Ok(())
    }

    async fn restore_employee(&self, employee: &Employee) -> Result<()> {
        let mut restored = employee.clone();
        restored.deleted_at = None;
        self.tables.write().await.employees.insert(restored.id.clone(), restored);
        Ok(())
    }

    async fn save_variables(&self, variables: &MonthlyVariables) -> Result<()> {
        self.tables
            .write()
            .await
            .variables
            .insert(variables.id.clone(), variables.clone());
        Ok(())
    }

    async fn get_variables(&self, id: &str) -> Result<Option<MonthlyVariables>> {
        Ok(self.tables.read().await.variables.get(id).cloned())
    }

    async fn insert_payslip(&self, payslip: &Payslip) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .payslips
            .values()
            .any(|p| p.variables_id == payslip.variables_id)
        {
            return Err(PayflowError::bad_request(format!(
                "Payslip already generated for monthly variables {}",
                payslip.variables_id
            )));
        }
        insert_new(&mut tables.payslips, &payslip.id, payslip.clone(), "Payslip")
    }

    async fn get_payslip(&self, id: &str) -> Result<Option<Payslip>> {
        Ok(self.tables.read().await.payslips.get(id).cloned())
    }

    async fn find_payslip_by_variables(&self, variables_id: &str) -> Result<Option<Payslip>> {
        Ok(self
            .tables
            .read()
            .await
            .payslips
            .values()
            .find(|p| p.variables_id == variables_id)
            .cloned())
    }

    async fn update_payslip_status(&self, id: &str, status: PayslipStatus) -> Result<()> {
        let mut tables = self.tables.write().await;
        let payslip = tables.payslips.get_mut(id).ok_or_else(|| not_found("Payslip", id))?;
        payslip.status = status;
        Ok(())
    }

    async fn list_payslips_for_employee(&self, employee_id: &str) -> Result<Vec<Payslip>> {
        let tables = self.tables.read().await;
        let mut payslips: Vec<Payslip> = tables
            .payslips
            .values()
            .filter(|p| p.employee_id == employee_id)
            .cloned()
            .collect();
        payslips.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        Ok(payslips)
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number)
        {
            return Err(PayflowError::bad_request(format!(
                "Invoice number {} already used",
                invoice.invoice_number
            )));
        }
        insert_new(&mut tables.invoices, &invoice.id, invoice.clone(), "Invoice")
    }

    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>> {
        Ok(self.tables.read().await.invoices.get(id).cloned())
    }

    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<()> {
        let mut tables = self.tables.write().await;
        let invoice = tables.invoices.get_mut(id).ok_or_else(|| not_found("Invoice", id))?;
        invoice.status = status;
        Ok(())
    }

    async fn list_invoices_for_client(&self, client_company_id: &str) -> Result<Vec<Invoice>> {
        let tables = self.tables.read().await;
        let mut invoices: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|i| i.client_company_id == client_company_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        Ok(invoices)
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<()> {
        let mut tables = self.tables.write().await;
        insert_new(&mut tables.invitations, &invitation.id, invitation.clone(), "Invitation")
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>> {
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .values()
            .find(|i| i.token == token)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InvitationRole;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_company_soft_delete_and_restore() {
        let backend = InMemoryBackend::new();
        let provider = Company::provider("Provider A");
        let client = Company::client("Client B", &provider.id);
        backend.insert_company(&provider).await.unwrap();
        backend.insert_company(&client).await.unwrap();

        assert_eq!(backend.list_clients(&provider.id).await.unwrap().len(), 1);

        backend.soft_delete_company(&client.id, Utc::now()).await.unwrap();
        assert!(backend.list_clients(&provider.id).await.unwrap().is_empty());
        assert!(backend.get_company(&client.id).await.unwrap().unwrap().is_deleted());

        backend.restore_company(&client).await.unwrap();
        assert_eq!(backend.list_clients(&provider.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let backend = InMemoryBackend::new();
        let company = Company::provider("Provider A");
        backend.insert_company(&company).await.unwrap();
        let err = backend.insert_company(&company).await.unwrap_err();
        assert!(matches!(err, PayflowError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_employee_counts_and_roster() {
        let backend = InMemoryBackend::new();
        let a = Employee::new("provider_a", "A", "One", "a@example.com", dec!(45)).placed_at("client_b");
        let b = Employee::new("provider_a", "B", "Two", "b@example.com", dec!(50)).placed_at("client_b");
        let c = Employee::new("provider_x", "C", "Three", "c@example.com", dec!(30)).placed_at("client_b");
        for e in [&a, &b, &c] {
            backend.insert_employee(e).await.unwrap();
        }

        assert_eq!(backend.count_active_employees("provider_a").await.unwrap(), 2);
        assert_eq!(backend.list_employees_for_client("client_b").await.unwrap().len(), 3);

        backend.soft_delete_employee(&a.id, Utc::now()).await.unwrap();
        assert_eq!(backend.count_active_employees("provider_a").await.unwrap(), 1);
        assert_eq!(backend.list_employees_for_client("client_b").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let backend = InMemoryBackend::new();
        assert!(backend.get_employee("nope").await.unwrap().is_none());
        let err = backend.soft_delete_employee("nope", Utc::now()).await.unwrap_err();
        assert!(matches!(err, PayflowError::NotFound(_)));
        assert!(backend.update_payslip_status("nope", PayslipStatus::Sent).await.is_err());
        assert!(backend.update_invoice_status("nope", InvoiceStatus::Sent).await.is_err());
    }

    #[tokio::test]
    async fn test_one_payslip_per_variables() {
        let backend = InMemoryBackend::new();
        let mut variables = MonthlyVariables::new("emp_1", "client_b", 3, 2025).unwrap();
        variables.submit().unwrap();
        variables.approve().unwrap();

        let (first, _) = Payslip::generate(&variables, dec!(45), Utc::now()).unwrap();
        let (second, _) = Payslip::generate(&variables, dec!(45), Utc::now()).unwrap();
        backend.insert_payslip(&first).await.unwrap();

        let err = backend.insert_payslip(&second).await.unwrap_err();
        assert!(matches!(err, PayflowError::BadRequest(_)));
        assert_eq!(
            backend.find_payslip_by_variables(&variables.id).await.unwrap(),
            Some(first.clone())
        );
        assert_eq!(backend.get_payslip(&first.id).await.unwrap(), Some(first));
        assert!(backend.get_payslip(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invitation_lookup() {
        let backend = InMemoryBackend::new();
        let invitation = Invitation::new("provider_a", "b@example.com", InvitationRole::Client, Utc::now());
        backend.insert_invitation(&invitation).await.unwrap();

        let found = backend.find_invitation_by_token(&invitation.token).await.unwrap();
        assert_eq!(found, Some(invitation));
        assert!(backend.find_invitation_by_token("bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_tables() {
        let backend = InMemoryBackend::new();
        let shared = backend.clone();
        backend.insert_company(&Company::provider("Provider A")).await.unwrap();
        assert_eq!(shared.tables.read().await.companies.len(), 1);
    }
}
