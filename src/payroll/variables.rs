//! Monthly variables entered by the client company.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calculator::STANDARD_MONTHLY_HOURS;
use crate::error::{PayflowError, Result};

/// Review state of a month's variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariablesStatus {
    Draft,
    Submitted,
    Validated,
}

impl VariablesStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Validated => "validated",
        }
    }
}

impl std::fmt::Display for VariablesStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs for one employee's payslip for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyVariables {
    pub id: String,
    pub employee_id: String,
    pub client_company_id: String,
    /// 1 to 12.
    pub month: u32,
    pub year: i32,
    pub hours_worked: Decimal,
    pub overtime_hours: Decimal,
    /// Informational only.
    pub vacation_days: u32,
    /// Informational only.
    pub sick_days: u32,
    pub bonuses: Decimal,
    pub notes: Option<String>,
    pub status: VariablesStatus,
}

impl MonthlyVariables {
    /// New draft with the standard monthly hours and nothing else.
    pub fn new(
        employee_id: impl Into<String>,
        client_company_id: impl Into<String>,
        month: u32,
        year: i32,
    ) -> Result<Self> {
        validate_period(month, year)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: employee_id.into(),
            client_company_id: client_company_id.into(),
            month,
            year,
            hours_worked: STANDARD_MONTHLY_HOURS,
            overtime_hours: Decimal::ZERO,
            vacation_days: 0,
            sick_days: 0,
            bonuses: Decimal::ZERO,
            notes: None,
            status: VariablesStatus::Draft,
        })
    }

    #[must_use]
    pub fn with_hours(mut self, hours_worked: Decimal) -> Self {
        self.hours_worked = hours_worked;
        self
    }

    #[must_use]
    pub fn with_overtime(mut self, overtime_hours: Decimal) -> Self {
        self.overtime_hours = overtime_hours;
        self
    }

    #[must_use]
    pub fn with_bonuses(mut self, bonuses: Decimal) -> Self {
        self.bonuses = bonuses;
        self
    }

    #[must_use]
    pub fn with_absences(mut self, vacation_days: u32, sick_days: u32) -> Self {
        self.vacation_days = vacation_days;
        self.sick_days = sick_days;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check period and amounts.
    pub fn validate(&self) -> Result<()> {
        validate_period(self.month, self.year)?;
        for (field, value) in [
            ("hours_worked", self.hours_worked),
            ("overtime_hours", self.overtime_hours),
            ("bonuses", self.bonuses),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(PayflowError::bad_request(format!(
                    "{} cannot be negative",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Draft to submitted. Amounts are checked before leaving draft.
    pub fn submit(&mut self) -> Result<()> {
        self.validate()?;
        self.transition(VariablesStatus::Draft, VariablesStatus::Submitted)
    }

    /// Submitted to validated. Validation unlocks payslip generation.
    pub fn approve(&mut self) -> Result<()> {
        self.transition(VariablesStatus::Submitted, VariablesStatus::Validated)
    }

    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.status == VariablesStatus::Validated
    }

    fn transition(&mut self, from: VariablesStatus, to: VariablesStatus) -> Result<()> {
        if self.status != from {
            return Err(PayflowError::invalid_transition(format!(
                "Monthly variables {} cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

fn validate_period(month: u32, year: i32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(PayflowError::bad_request(format!(
            "Month must be between 1 and 12, got {}",
            month
        )));
    }
    if year < 2000 {
        return Err(PayflowError::bad_request(format!("Invalid year: {}", year)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let vars = MonthlyVariables::new("emp_1", "client_b", 3, 2025).unwrap();
        assert_eq!(vars.hours_worked, dec!(151.67));
        assert_eq!(vars.overtime_hours, Decimal::ZERO);
        assert_eq!(vars.status, VariablesStatus::Draft);
        assert!(!vars.is_validated());
    }

    #[test]
    fn test_invalid_period() {
        assert!(MonthlyVariables::new("emp_1", "client_b", 0, 2025).is_err());
        assert!(MonthlyVariables::new("emp_1", "client_b", 13, 2025).is_err());
        assert!(MonthlyVariables::new("emp_1", "client_b", 12, 1999).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut vars = MonthlyVariables::new("emp_1", "client_b", 3, 2025)
            .unwrap()
            .with_overtime(dec!(4))
            .with_absences(2, 1);

        vars.submit().unwrap();
        assert_eq!(vars.status, VariablesStatus::Submitted);
        vars.approve().unwrap();
        assert!(vars.is_validated());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut vars = MonthlyVariables::new("emp_1", "client_b", 3, 2025).unwrap();
        let err = vars.approve().unwrap_err();
        assert!(matches!(err, PayflowError::InvalidTransition(_)));

        vars.submit().unwrap();
        assert!(vars.submit().is_err());
        vars.approve().unwrap();
        assert!(vars.approve().is_err());
        assert!(vars.submit().is_err());
    }

    #[test]
    fn test_negative_amounts_rejected_on_submit() {
        let mut vars = MonthlyVariables::new("emp_1", "client_b", 3, 2025)
            .unwrap()
            .with_bonuses(dec!(-10));
        let err = vars.submit().unwrap_err();
        assert!(matches!(err, PayflowError::BadRequest(_)));
        assert_eq!(vars.status, VariablesStatus::Draft);
    }
}
