//! Client invoices issued by a payroll provider.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::number::InvoiceNumber;
use crate::error::{PayflowError, Result};
use crate::payroll::round_cents;

/// Days between issue and due date.
pub const DEFAULT_DUE_DAYS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    /// Allowed moves: draft to sent, sent to paid or overdue, overdue to paid.
    #[must_use]
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Sent)
                | (Self::Sent, Self::Paid)
                | (Self::Sent, Self::Overdue)
                | (Self::Overdue, Self::Paid)
        )
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: InvoiceNumber,
    pub provider_company_id: String,
    pub client_company_id: String,
    pub month: u32,
    pub year: i32,
    /// Rounded to the cent.
    pub amount: Decimal,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
}

/// Fields needed to draft an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: InvoiceNumber,
    pub provider_company_id: String,
    pub client_company_id: String,
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
}

impl Invoice {
    /// Draft an invoice issued at `issue_date`, due `due_days` later.
    pub fn draft(new: NewInvoice, issue_date: DateTime<Utc>, due_days: u32) -> Result<Self> {
        if !(1..=12).contains(&new.month) {
            return Err(PayflowError::bad_request(format!(
                "Month must be between 1 and 12, got {}",
                new.month
            )));
        }
        if new.amount.is_sign_negative() && !new.amount.is_zero() {
            return Err(PayflowError::bad_request("Invoice amount cannot be negative"));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_number: new.invoice_number,
            provider_company_id: new.provider_company_id,
            client_company_id: new.client_company_id,
            month: new.month,
            year: new.year,
            amount: round_cents(new.amount),
            issue_date,
            due_date: issue_date + Duration::days(i64::from(due_days)),
            status: InvoiceStatus::Draft,
        })
    }

    /// Move to `next` if the lifecycle allows it.
    pub fn transition(&mut self, next: InvoiceStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PayflowError::invalid_transition(format!(
                "Invoice {} cannot move from {} to {}",
                self.invoice_number, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_sent(&mut self) -> Result<()> {
        self.transition(InvoiceStatus::Sent)
    }

    pub fn mark_paid(&mut self) -> Result<()> {
        self.transition(InvoiceStatus::Paid)
    }

    pub fn mark_overdue(&mut self) -> Result<()> {
        self.transition(InvoiceStatus::Overdue)
    }

    /// Whether a sent invoice is past its due date at `now`.
    #[must_use]
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Sent && now > self.due_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn draft(amount: Decimal) -> Invoice {
        let issued = Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap();
        Invoice::draft(
            NewInvoice {
                invoice_number: InvoiceNumber::new(2025, 12).unwrap(),
                provider_company_id: "provider_a".to_string(),
                client_company_id: "client_b".to_string(),
                month: 5,
                year: 2025,
                amount,
            },
            issued,
            DEFAULT_DUE_DAYS,
        )
        .unwrap()
    }

    #[test]
    fn test_draft_dates_and_rounding() {
        let inv = draft(dec!(15849.515));
        assert_eq!(inv.amount, dec!(15849.52));
        assert_eq!(inv.due_date, Utc.with_ymd_and_hms(2025, 6, 4, 8, 0, 0).unwrap());
        assert_eq!(inv.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_lifecycle() {
        let mut inv = draft(dec!(100));
        inv.mark_sent().unwrap();
        inv.mark_overdue().unwrap();
        inv.mark_paid().unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_rejected_transitions() {
        let mut inv = draft(dec!(100));
        assert!(inv.mark_paid().is_err());
        assert!(inv.mark_overdue().is_err());
        inv.mark_sent().unwrap();
        assert!(inv.mark_sent().is_err());
        inv.mark_paid().unwrap();
        let err = inv.mark_overdue().unwrap_err();
        assert!(matches!(err, PayflowError::InvalidTransition(_)));
    }

    #[test]
    fn test_is_overdue_at() {
        let mut inv = draft(dec!(100));
        let after_due = inv.due_date + Duration::seconds(1);
        assert!(!inv.is_overdue_at(after_due));

        inv.mark_sent().unwrap();
        assert!(!inv.is_overdue_at(inv.due_date));
        assert!(inv.is_overdue_at(after_due));
    }

    #[test]
    fn test_invalid_draft() {
        let issued = Utc::now();
        let new = NewInvoice {
            invoice_number: InvoiceNumber::new(2025, 1).unwrap(),
            provider_company_id: "provider_a".to_string(),
            client_company_id: "client_b".to_string(),
            month: 13,
            year: 2025,
            amount: dec!(1),
        };
        assert!(Invoice::draft(new.clone(), issued, 15).is_err());
        assert!(Invoice::draft(NewInvoice { month: 1, amount: dec!(-1), ..new }, issued, 15).is_err());
    }

    #[test]
    fn test_serde_shape() {
        let inv = draft(dec!(100));
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["invoice_number"], "FAC-2025-0012");
        assert_eq!(json["status"], "draft");
    }
}
