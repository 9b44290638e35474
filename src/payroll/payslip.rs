//! Payslips derived from validated monthly variables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calculator::{compute_for, SalaryBreakdown};
use super::variables::MonthlyVariables;
use crate::error::{PayflowError, Result};

/// Distribution state of a payslip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayslipStatus {
    Generated,
    Sent,
    Viewed,
}

impl PayslipStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
        }
    }
}

impl std::fmt::Display for PayslipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated payslip. Amounts are fixed at generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payslip {
    pub id: String,
    pub employee_id: String,
    pub variables_id: String,
    pub month: u32,
    pub year: i32,
    /// Rounded to the cent.
    pub gross_salary: Decimal,
    /// Rounded to the cent.
    pub net_salary: Decimal,
    pub status: PayslipStatus,
    pub created_at: DateTime<Utc>,
}

impl Payslip {
    /// Build a payslip from validated variables and the employee's hourly rate.
    ///
    /// Returns the payslip together with the full breakdown used to compute it.
    pub fn generate(
        variables: &MonthlyVariables,
        hourly_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Self, SalaryBreakdown)> {
        if !variables.is_validated() {
            return Err(PayflowError::invalid_transition(format!(
                "Monthly variables {} are {}, payslips need validated variables",
                variables.id, variables.status
            )));
        }

        let breakdown = compute_for(variables, hourly_rate).rounded();
        let payslip = Self {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: variables.employee_id.clone(),
            variables_id: variables.id.clone(),
            month: variables.month,
            year: variables.year,
            gross_salary: breakdown.gross_salary,
            net_salary: breakdown.net_salary,
            status: PayslipStatus::Generated,
            created_at: now,
        };
        Ok((payslip, breakdown))
    }

    /// Generated to sent.
    pub fn mark_sent(&mut self) -> Result<()> {
        match self.status {
            PayslipStatus::Generated => {
                self.status = PayslipStatus::Sent;
                Ok(())
            }
            other => Err(self.bad_transition(other, PayslipStatus::Sent)),
        }
    }

    /// Sent (or generated, when opened before sending) to viewed.
    pub fn mark_viewed(&mut self) -> Result<()> {
        match self.status {
            PayslipStatus::Generated | PayslipStatus::Sent => {
                self.status = PayslipStatus::Viewed;
                Ok(())
            }
            other => Err(self.bad_transition(other, PayslipStatus::Viewed)),
        }
    }

    fn bad_transition(&self, from: PayslipStatus, to: PayslipStatus) -> PayflowError {
        PayflowError::invalid_transition(format!(
            "Payslip {} cannot move from {} to {}",
            self.id, from, to
        ))
    }
}
