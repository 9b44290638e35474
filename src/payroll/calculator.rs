//! Gross to net salary derivation.
//!
//! Pure functions over [`Decimal`]. Figures in a [`SalaryBreakdown`] are
//! exact except `total_deductions`, which is rounded to the cent; use
//! [`SalaryBreakdown::rounded`] for the values stored on a payslip.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::variables::MonthlyVariables;

/// Legal monthly hours for a 35-hour week.
pub const STANDARD_MONTHLY_HOURS: Decimal = dec!(151.67);

/// Overtime premium (25 %).
pub const OVERTIME_MULTIPLIER: Decimal = dec!(1.25);

/// Flat employer-side charge estimate. Informational only.
pub const EMPLOYER_CHARGE_RATE: Decimal = dec!(0.42);

/// A statutory employee contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub label: &'static str,
    pub rate: Decimal,
}

/// Employee contributions withheld from gross salary.
pub const EMPLOYEE_CONTRIBUTIONS: [Contribution; 6] = [
    Contribution { label: "CSG/CRDS", rate: dec!(0.098) },
    Contribution { label: "Health insurance", rate: dec!(0.007) },
    Contribution { label: "Unemployment insurance", rate: dec!(0.024) },
    Contribution { label: "Base pension", rate: dec!(0.069) },
    Contribution { label: "Complementary pension", rate: dec!(0.039) },
    Contribution { label: "Provident fund", rate: dec!(0.015) },
];

/// Sum of [`EMPLOYEE_CONTRIBUTIONS`] (0.242).
#[must_use]
pub fn employee_contribution_rate() -> Decimal {
    EMPLOYEE_CONTRIBUTIONS.iter().map(|c| c.rate).sum()
}

/// Round to the cent, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for display, e.g. `1234.57 €`.
#[must_use]
pub fn format_eur(amount: Decimal) -> String {
    format!("{:.2} €", round_cents(amount))
}

/// Result of [`compute_salary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryBreakdown {
    pub base_salary: Decimal,
    pub overtime_pay: Decimal,
    pub gross_salary: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    pub employer_charges: Decimal,
}

impl SalaryBreakdown {
    /// Every figure rounded to the cent.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            base_salary: round_cents(self.base_salary),
            overtime_pay: round_cents(self.overtime_pay),
            gross_salary: round_cents(self.gross_salary),
            total_deductions: round_cents(self.total_deductions),
            net_salary: round_cents(self.net_salary),
            employer_charges: round_cents(self.employer_charges),
        }
    }

    /// Per-contribution amounts for the payslip detail, each rounded to the cent.
    ///
    /// The lines may differ from `total_deductions` by a cent, since the total
    /// is rounded once on the summed rate.
    #[must_use]
    pub fn contribution_lines(&self) -> Vec<ContributionLine> {
        EMPLOYEE_CONTRIBUTIONS
            .iter()
            .map(|c| ContributionLine {
                label: c.label,
                rate: c.rate,
                amount: round_cents(self.gross_salary * c.rate),
            })
            .collect()
    }
}

/// One itemized contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionLine {
    pub label: &'static str,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Derive gross, deductions and net from an hourly rate and the month's inputs.
#[must_use]
pub fn compute_salary(
    hourly_rate: Decimal,
    hours_worked: Decimal,
    overtime_hours: Decimal,
    bonuses: Decimal,
) -> SalaryBreakdown {
    let base_salary = hours_worked * hourly_rate;
    let overtime_pay = overtime_hours * hourly_rate * OVERTIME_MULTIPLIER;
    let gross_salary = base_salary + overtime_pay + bonuses;
    let total_deductions = round_cents(gross_salary * employee_contribution_rate());

    SalaryBreakdown {
        base_salary,
        overtime_pay,
        gross_salary,
        total_deductions,
        net_salary: gross_salary - total_deductions,
        employer_charges: gross_salary * EMPLOYER_CHARGE_RATE,
    }
}

/// [`compute_salary`] over a month's variables.
///
/// Vacation and sick days are informational and do not change any figure.
#[must_use]
pub fn compute_for(variables: &MonthlyVariables, hourly_rate: Decimal) -> SalaryBreakdown {
    compute_salary(
        hourly_rate,
        variables.hours_worked,
        variables.overtime_hours,
        variables.bonuses,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_rates_sum() {
        assert_eq!(employee_contribution_rate(), dec!(0.242));
    }

    #[test]
    fn test_gross_equals_base_without_extras() {
        for (rate, hours) in [
            (dec!(0), dec!(151.67)),
            (dec!(11.65), dec!(151.67)),
            (dec!(45), dec!(120.5)),
            (dec!(37.333), dec!(0)),
        ] {
            let b = compute_salary(rate, hours, Decimal::ZERO, Decimal::ZERO);
            assert_eq!(b.gross_salary, rate * hours);
            assert_eq!(b.overtime_pay, Decimal::ZERO);
        }
    }

    #[test]
    fn test_overtime_premium() {
        let b = compute_salary(dec!(45), dec!(151.67), dec!(10), Decimal::ZERO);
        assert_eq!(b.overtime_pay, dec!(562.50));
        assert_eq!(b.base_salary, dec!(6825.15));
        assert_eq!(b.gross_salary, dec!(7387.65));
    }

    #[test]
    fn test_deductions_and_net() {
        let b = compute_salary(dec!(1), dec!(6824.15), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(b.gross_salary, dec!(6824.15));
        assert_eq!(b.total_deductions, dec!(1651.44));
        assert_eq!(b.net_salary, dec!(5172.71));
        assert_eq!(b.net_salary, b.gross_salary - b.total_deductions);
    }

    #[test]
    fn test_bonuses_add_to_gross() {
        let b = compute_salary(dec!(20), dec!(100), Decimal::ZERO, dec!(250));
        assert_eq!(b.gross_salary, dec!(2250));
        assert_eq!(b.employer_charges, dec!(945.00));
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(round_cents(dec!(15847.565)), dec!(15847.57));
        assert_eq!(round_cents(dec!(0.125)), dec!(0.13));
        assert_eq!(round_cents(dec!(0.124)), dec!(0.12));
        assert_eq!(format_eur(dec!(15847.565)), "15847.57 €");
        assert_eq!(format_eur(dec!(12)), "12.00 €");
    }

    #[test]
    fn test_rounded_breakdown() {
        let b = compute_salary(dec!(12.345), dec!(151.67), dec!(3.5), Decimal::ZERO).rounded();
        assert_eq!(b.gross_salary, round_cents(b.gross_salary));
        assert_eq!(b.net_salary.scale(), 2);
    }

    #[test]
    fn test_contribution_lines() {
        let b = compute_salary(dec!(1), dec!(1000), Decimal::ZERO, Decimal::ZERO);
        let lines = b.contribution_lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].label, "CSG/CRDS");
        assert_eq!(lines[0].amount, dec!(98.00));
        let sum: Decimal = lines.iter().map(|l| l.amount).sum();
        assert_eq!(sum, b.total_deductions);
    }
}
