//! Payroll workflows.
//!
//! [`PayrollService`] wires the subscription ledger, the deletion history,
//! the relational backend and invoice numbering together. Every roster
//! change goes through here so the ledger's employee count stays in step
//! with the backend.
//!
//! ```rust,ignore
//! use payflow::backend::{Company, Employee, InMemoryBackend};
//! use payflow::service::PayrollService;
//! use payflow::storage::InMemoryKvStore;
//!
//! let service = PayrollService::new(InMemoryBackend::new(), InMemoryKvStore::new());
//! let provider = Company::provider("Provider A");
//! service.register_provider(&provider).await?;
//!
//! let employee = Employee::new(&provider.id, "Jeanne", "Martin", "j@example.com", dec!(45));
//! service.add_employee(&provider.id, employee).await?;
//! ```

use std::sync::Arc;

use chrono::Datelike;

use crate::backend::{self, Company, CompanyKind, Employee, PayrollBackend};
use crate::billing::{
    BillingAuditEvent, BillingAuditLogger, PolicyCheck, Subscription, SubscriptionLedger,
    TracingAuditLogger,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, InvoiceNumbering, PayrollConfig};
use crate::deletion::{DeletedEntityType, DeletionLedger, DeletionRecord};
use crate::error::{PayflowError, Result};
use crate::invoicing::{
    calculate_invoice_amount, resolve_invoice_amount, Invoice, InvoiceNumberGenerator, NewInvoice,
    RandomInvoiceNumbers, SequentialInvoiceNumbers, DEFAULT_DUE_DAYS,
};
use crate::payroll::{Payslip, SalaryBreakdown};
use crate::storage;
use crate::traits::kv::KeyValueStore;

/// Gated payroll operations over a backend and a key-value store.
pub struct PayrollService<B, S, C = SystemClock, A = TracingAuditLogger> {
    backend: B,
    ledger: SubscriptionLedger<S, C, A>,
    deletions: DeletionLedger<S, C>,
    numbers: Box<dyn InvoiceNumberGenerator>,
    invoice_due_days: u32,
}

impl<B, S> PayrollService<B, S>
where
    B: PayrollBackend,
    S: KeyValueStore + Clone,
{
    /// Service on the wall clock with random invoice numbers.
    #[must_use]
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            ledger: SubscriptionLedger::new(store.clone()),
            deletions: DeletionLedger::new(store),
            numbers: Box::new(RandomInvoiceNumbers),
            invoice_due_days: DEFAULT_DUE_DAYS,
        }
    }
}

impl<B, S> PayrollService<B, S>
where
    B: PayrollBackend,
    S: KeyValueStore + Clone + 'static,
{
    /// Service configured from [`PayrollConfig`].
    #[must_use]
    pub fn from_config(backend: B, store: S, config: &PayrollConfig) -> Self {
        let numbers: Box<dyn InvoiceNumberGenerator> = match config.invoice_numbering {
            InvoiceNumbering::Random => Box::new(RandomInvoiceNumbers),
            InvoiceNumbering::Sequential => Box::new(SequentialInvoiceNumbers::new(store.clone())),
        };
        Self {
            backend,
            ledger: SubscriptionLedger::new(store.clone()).with_trial_days(config.trial_days),
            deletions: DeletionLedger::new(store),
            numbers,
            invoice_due_days: config.invoice_due_days,
        }
    }
}

impl PayrollService<Arc<dyn PayrollBackend>, Arc<dyn KeyValueStore>> {
    /// Service wired entirely from [`Config`], with persisted state loaded.
    ///
    /// Uses the remote backend when its URL and key are set and the
    /// in-memory one otherwise. Ledger documents go to `storage.dir` when
    /// set and stay in memory otherwise.
    pub async fn open(config: &Config) -> Result<Self> {
        let backend = backend::open(&config.backend);
        let store = storage::open(&config.storage).await?;
        let service = Self::from_config(backend, store, &config.payroll);
        service.hydrate().await?;
        Ok(service)
    }
}

impl<B, S, C, A> PayrollService<B, S, C, A>
where
    B: PayrollBackend,
    S: KeyValueStore,
    C: Clock + Clone,
    A: BillingAuditLogger,
{
    /// Replace the time source of both ledgers.
    #[must_use]
    pub fn with_clock<C2: Clock + Clone>(self, clock: C2) -> PayrollService<B, S, C2, A> {
        PayrollService {
            backend: self.backend,
            ledger: self.ledger.with_clock(clock.clone()),
            deletions: self.deletions.with_clock(clock),
            numbers: self.numbers,
            invoice_due_days: self.invoice_due_days,
        }
    }

    /// Replace the audit logger.
    #[must_use]
    pub fn with_audit_logger<A2: BillingAuditLogger>(self, audit: A2) -> PayrollService<B, S, C, A2> {
        PayrollService {
            backend: self.backend,
            ledger: self.ledger.with_audit_logger(audit),
            deletions: self.deletions,
            numbers: self.numbers,
            invoice_due_days: self.invoice_due_days,
        }
    }

    #[must_use]
    pub fn with_invoice_numbers(mut self, numbers: impl InvoiceNumberGenerator + 'static) -> Self {
        self.numbers = Box::new(numbers);
        self
    }

    #[must_use]
    pub fn with_invoice_due_days(mut self, days: u32) -> Self {
        self.invoice_due_days = days;
        self
    }

    pub fn ledger(&self) -> &SubscriptionLedger<S, C, A> {
        &self.ledger
    }

    pub fn deletions(&self) -> &DeletionLedger<S, C> {
        &self.deletions
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load persisted ledger state.
    pub async fn hydrate(&self) -> Result<()> {
        self.ledger.hydrate().await?;
        self.deletions.hydrate().await?;
        Ok(())
    }

    /// Create a provider company and start its trial.
    pub async fn register_provider(&self, company: &Company) -> Result<Subscription> {
        if company.kind != CompanyKind::Provider {
            return Err(PayflowError::bad_request(format!(
                "Company {} is not a payroll provider",
                company.id
            )));
        }
        self.backend.insert_company(company).await?;
        self.ledger.init_trial_subscription(&company.id).await
    }

    /// Add an employee to a provider's roster if the plan allows it.
    pub async fn add_employee(&self, provider_id: &str, mut employee: Employee) -> Result<Employee> {
        let check = self.ledger.can_add_employee(provider_id).await;
        if !check.allowed {
            return Err(self
                .deny(provider_id, "add_employee", PolicyCheck { allowed: false, reason: check.reason })
                .await);
        }

        employee.company_id = provider_id.to_string();
        employee.deleted_at = None;
        self.backend.insert_employee(&employee).await?;
        let count = self.sync_employee_count(provider_id).await?;

        tracing::info!(
            target: "payflow::service",
            company_id = %provider_id,
            employee_id = %employee.id,
            employee_count = count,
            "Employee added"
        );
        Ok(employee)
    }

    /// Record the snapshot, soft-delete the employee and update the count.
    ///
    /// A failed soft delete drops the fresh record again. The count is
    /// re-read from the backend on every path.
    pub async fn delete_employee(
        &self,
        provider_id: &str,
        employee_id: &str,
        reason: Option<String>,
    ) -> Result<DeletionRecord> {
        let employee = self
            .backend
            .get_employee(employee_id)
            .await?
            .filter(|e| e.company_id == provider_id && !e.is_deleted())
            .ok_or_else(|| PayflowError::not_found(format!("Employee {}", employee_id)))?;

        let record = match self
            .deletions
            .record_deletion(DeletedEntityType::Employee, serde_json::to_value(&employee)?, reason)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                self.resync_after_failure(provider_id).await;
                return Err(err);
            }
        };
        if let Err(err) = self
            .backend
            .soft_delete_employee(employee_id, self.ledger.now())
            .await
        {
            self.forget_deletion(&record.id).await;
            self.resync_after_failure(provider_id).await;
            return Err(err);
        }
        self.sync_employee_count(provider_id).await?;

        self.ledger
            .audit()
            .log(BillingAuditEvent::EntityDeleted {
                deletion_id: record.id.clone(),
                entity_type: DeletedEntityType::Employee.to_string(),
            })
            .await;
        Ok(record)
    }

    /// Record the snapshot and soft-delete a company.
    pub async fn delete_company(&self, company_id: &str, reason: Option<String>) -> Result<DeletionRecord> {
        let company = self
            .backend
            .get_company(company_id)
            .await?
            .filter(|c| !c.is_deleted())
            .ok_or_else(|| PayflowError::not_found(format!("Company {}", company_id)))?;

        let record = self
            .deletions
            .record_deletion(DeletedEntityType::Company, serde_json::to_value(&company)?, reason)
            .await?;
        if let Err(err) = self
            .backend
            .soft_delete_company(company_id, self.ledger.now())
            .await
        {
            self.forget_deletion(&record.id).await;
            return Err(err);
        }

        self.ledger
            .audit()
            .log(BillingAuditEvent::EntityDeleted {
                deletion_id: record.id.clone(),
                entity_type: DeletedEntityType::Company.to_string(),
            })
            .await;
        Ok(record)
    }

    /// Put a deleted entity back and drop its deletion record.
    ///
    /// Employees count against the plan again, so their restore is gated
    /// like [`add_employee`](Self::add_employee). The backend is written
    /// first; the record is only removed once the entity is back. A denied
    /// or failed restore leaves the record in place. Unknown ids return
    /// `Ok(None)`.
    pub async fn restore(&self, deletion_id: &str) -> Result<Option<DeletionRecord>> {
        let Some(record) = self.deletions.get(deletion_id).await else {
            return Ok(None);
        };

        match record.entity_type {
            DeletedEntityType::Employee => {
                let employee: Employee = serde_json::from_value(record.data.clone())?;
                let check = self.ledger.can_add_employee(&employee.company_id).await;
                if !check.allowed {
                    return Err(self
                        .deny(
                            &employee.company_id,
                            "restore_employee",
                            PolicyCheck { allowed: false, reason: check.reason },
                        )
                        .await);
                }
                self.backend.restore_employee(&employee).await?;
                self.sync_employee_count(&employee.company_id).await?;
            }
            DeletedEntityType::Company => {
                let company: Company = serde_json::from_value(record.data.clone())?;
                self.backend.restore_company(&company).await?;
            }
        }

        let restored = self.deletions.restore_item(deletion_id).await?;
        self.ledger
            .audit()
            .log(BillingAuditEvent::EntityRestored {
                deletion_id: deletion_id.to_string(),
                entity_type: record.entity_type.to_string(),
            })
            .await;
        Ok(restored)
    }

    /// Generate and store the payslip for validated monthly variables.
    ///
    /// One payslip per set of variables; a second attempt is a `BadRequest`.
    pub async fn generate_payslip(
        &self,
        provider_id: &str,
        variables_id: &str,
    ) -> Result<(Payslip, SalaryBreakdown)> {
        let check = self.ledger.can_create_payslip(provider_id).await;
        if !check.allowed {
            return Err(self.deny(provider_id, "generate_payslip", check).await);
        }

        let variables = self
            .backend
            .get_variables(variables_id)
            .await?
            .ok_or_else(|| PayflowError::not_found(format!("Monthly variables {}", variables_id)))?;
        let employee = self
            .backend
            .get_employee(&variables.employee_id)
            .await?
            .filter(|e| e.company_id == provider_id && !e.is_deleted())
            .ok_or_else(|| PayflowError::not_found(format!("Employee {}", variables.employee_id)))?;
        if let Some(existing) = self.backend.find_payslip_by_variables(&variables.id).await? {
            return Err(PayflowError::bad_request(format!(
                "Payslip {} already generated for monthly variables {}",
                existing.id, variables.id
            )));
        }

        let (payslip, breakdown) = Payslip::generate(&variables, employee.hourly_rate, self.ledger.now())?;
        self.backend.insert_payslip(&payslip).await?;

        tracing::info!(
            target: "payflow::service",
            company_id = %provider_id,
            payslip_id = %payslip.id,
            gross = %payslip.gross_salary,
            net = %payslip.net_salary,
            "Payslip generated"
        );
        Ok((payslip, breakdown))
    }

    /// Mark a generated payslip as sent to the employee.
    pub async fn send_payslip(&self, provider_id: &str, payslip_id: &str) -> Result<Payslip> {
        let mut payslip = self.provider_payslip(provider_id, payslip_id).await?;
        payslip.mark_sent()?;
        self.backend.update_payslip_status(&payslip.id, payslip.status).await?;
        tracing::info!(target: "payflow::service", payslip_id = %payslip.id, "Payslip sent");
        Ok(payslip)
    }

    /// Mark a payslip as opened by the employee.
    pub async fn mark_payslip_viewed(&self, provider_id: &str, payslip_id: &str) -> Result<Payslip> {
        let mut payslip = self.provider_payslip(provider_id, payslip_id).await?;
        payslip.mark_viewed()?;
        self.backend.update_payslip_status(&payslip.id, payslip.status).await?;
        Ok(payslip)
    }

    /// Draft and store an invoice for a client's month.
    ///
    /// The amount comes from the client's active roster unless a non-blank
    /// `override_amount` is given.
    pub async fn create_invoice(
        &self,
        provider_id: &str,
        client_company_id: &str,
        month: u32,
        year: i32,
        override_amount: Option<&str>,
    ) -> Result<Invoice> {
        let check = self.ledger.can_create_invoice(provider_id).await;
        if !check.allowed {
            return Err(self.deny(provider_id, "create_invoice", check).await);
        }

        self.backend
            .get_company(client_company_id)
            .await?
            .filter(|c| c.provider_id.as_deref() == Some(provider_id) && !c.is_deleted())
            .ok_or_else(|| PayflowError::not_found(format!("Client company {}", client_company_id)))?;

        let roster = self.backend.list_employees_for_client(client_company_id).await?;
        let calculated = calculate_invoice_amount(&roster, client_company_id);
        let amount = resolve_invoice_amount(calculated, override_amount)?;

        let now = self.ledger.now();
        let invoice_number = self.numbers.next_number(now.year()).await?;
        let invoice = Invoice::draft(
            NewInvoice {
                invoice_number,
                provider_company_id: provider_id.to_string(),
                client_company_id: client_company_id.to_string(),
                month,
                year,
                amount,
            },
            now,
            self.invoice_due_days,
        )?;
        self.backend.insert_invoice(&invoice).await?;

        tracing::info!(
            target: "payflow::service",
            company_id = %provider_id,
            client_company_id = %client_company_id,
            invoice_number = %invoice.invoice_number,
            amount = %invoice.amount,
            overridden = override_amount.is_some_and(|s| !s.trim().is_empty()),
            "Invoice created"
        );
        Ok(invoice)
    }

    pub async fn send_invoice(&self, provider_id: &str, invoice_id: &str) -> Result<Invoice> {
        self.update_invoice(provider_id, invoice_id, Invoice::mark_sent).await
    }

    pub async fn mark_invoice_paid(&self, provider_id: &str, invoice_id: &str) -> Result<Invoice> {
        self.update_invoice(provider_id, invoice_id, Invoice::mark_paid).await
    }

    pub async fn mark_invoice_overdue(&self, provider_id: &str, invoice_id: &str) -> Result<Invoice> {
        self.update_invoice(provider_id, invoice_id, Invoice::mark_overdue).await
    }

    /// Set the ledger's employee count from the backend's active roster.
    pub async fn sync_employee_count(&self, provider_id: &str) -> Result<u32> {
        let count = self.backend.count_active_employees(provider_id).await?;
        self.ledger.update_employee_count(provider_id, count).await?;
        Ok(count)
    }

    /// Payslip of one of the provider's employees.
    async fn provider_payslip(&self, provider_id: &str, payslip_id: &str) -> Result<Payslip> {
        let not_found = || PayflowError::not_found(format!("Payslip {}", payslip_id));
        let payslip = self.backend.get_payslip(payslip_id).await?.ok_or_else(not_found)?;
        let owned = self
            .backend
            .get_employee(&payslip.employee_id)
            .await?
            .is_some_and(|e| e.company_id == provider_id);
        if !owned {
            return Err(not_found());
        }
        Ok(payslip)
    }

    async fn update_invoice(
        &self,
        provider_id: &str,
        invoice_id: &str,
        step: fn(&mut Invoice) -> Result<()>,
    ) -> Result<Invoice> {
        let mut invoice = self
            .backend
            .get_invoice(invoice_id)
            .await?
            .filter(|i| i.provider_company_id == provider_id)
            .ok_or_else(|| PayflowError::not_found(format!("Invoice {}", invoice_id)))?;
        step(&mut invoice)?;
        self.backend.update_invoice_status(&invoice.id, invoice.status).await?;

        tracing::info!(
            target: "payflow::service",
            company_id = %provider_id,
            invoice_number = %invoice.invoice_number,
            status = %invoice.status,
            "Invoice status updated"
        );
        Ok(invoice)
    }

    /// Drop a deletion record whose entity could not be deleted.
    async fn forget_deletion(&self, deletion_id: &str) {
        if let Err(err) = self.deletions.restore_item(deletion_id).await {
            tracing::error!(
                target: "payflow::service",
                deletion_id = %deletion_id,
                error = %err,
                "Failed to drop deletion record after a failed delete"
            );
        }
    }

    /// Count refresh on an error path. The caller's error is the one returned.
    async fn resync_after_failure(&self, provider_id: &str) {
        if let Err(err) = self.sync_employee_count(provider_id).await {
            tracing::warn!(
                target: "payflow::service",
                company_id = %provider_id,
                error = %err,
                "Employee count not refreshed"
            );
        }
    }

    async fn deny(&self, company_id: &str, action: &'static str, check: PolicyCheck) -> PayflowError {
        let reason = check
            .reason
            .unwrap_or_else(|| "Action not allowed".to_string());
        tracing::info!(
            target: "payflow::service",
            company_id = %company_id,
            action = action,
            reason = %reason,
            "Action denied by plan policy"
        );
        self.ledger
            .audit()
            .log(BillingAuditEvent::ActionDenied {
                company_id: company_id.to_string(),
                action,
                reason: reason.clone(),
            })
            .await;
        PayflowError::policy_denied(reason)
    }
}
