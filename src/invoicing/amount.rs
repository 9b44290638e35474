//! Client invoice amount from the employee roster.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::backend::Employee;
use crate::error::{PayflowError, Result};
use crate::payroll::STANDARD_MONTHLY_HOURS;

/// Provider margin added on top of each employee's monthly cost.
pub const MARGIN_RATE: Decimal = dec!(0.10);

/// Monthly cost of one employee, margin included.
#[must_use]
pub fn billable_monthly(hourly_rate: Decimal) -> Decimal {
    let monthly = hourly_rate * STANDARD_MONTHLY_HOURS;
    monthly + monthly * MARGIN_RATE
}

/// Sum the monthly cost plus margin of every active employee placed at `client_company_id`.
///
/// Exact; round with [`round_cents`](crate::payroll::round_cents) for display.
#[must_use]
pub fn calculate_invoice_amount(employees: &[Employee], client_company_id: &str) -> Decimal {
    employees
        .iter()
        .filter(|e| !e.is_deleted())
        .filter(|e| e.client_company_id.as_deref() == Some(client_company_id))
        .map(|e| billable_monthly(e.hourly_rate))
        .sum()
}

/// Apply an operator override.
///
/// A non-blank override replaces `calculated` entirely. Both `.` and `,`
/// are accepted as decimal separator.
pub fn resolve_invoice_amount(calculated: Decimal, override_amount: Option<&str>) -> Result<Decimal> {
    let Some(raw) = override_amount.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(calculated);
    };

    let amount = Decimal::from_str(&raw.replace(',', "."))
        .map_err(|_| PayflowError::bad_request(format!("Invalid invoice amount: {}", raw)))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PayflowError::bad_request("Invoice amount cannot be negative"));
    }
    Ok(amount)
}
