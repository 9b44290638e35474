//! Salary computation, monthly variables and payslips.
//!
//! ```rust
//! use payflow::payroll::compute_salary;
//! use rust_decimal_macros::dec;
//!
//! let b = compute_salary(dec!(45), dec!(151.67), dec!(10), dec!(0));
//! assert_eq!(b.overtime_pay, dec!(562.50));
//! assert_eq!(b.net_salary, b.gross_salary - b.total_deductions);
//! ```

pub mod calculator;
pub mod payslip;
pub mod variables;

pub use calculator::{
    compute_for, compute_salary, employee_contribution_rate, format_eur, round_cents,
    Contribution, ContributionLine, SalaryBreakdown, EMPLOYEE_CONTRIBUTIONS, EMPLOYER_CHARGE_RATE,
    OVERTIME_MULTIPLIER, STANDARD_MONTHLY_HOURS,
};
pub use payslip::{Payslip, PayslipStatus};
pub use variables::{MonthlyVariables, VariablesStatus};
