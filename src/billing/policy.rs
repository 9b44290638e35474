//! Results of gating queries.
//!
//! A denial is a value, not an error. Callers that prefer `?` use
//! [`PolicyCheck::into_result`].

use serde::{Deserialize, Serialize};

use super::plans::EmployeeLimit;
use crate::error::{PayflowError, Result};

pub(crate) const REASON_NO_SUBSCRIPTION: &str = "No active subscription";
pub(crate) const REASON_CANCELLED: &str = "Subscription cancelled";
pub(crate) const REASON_EXPIRED: &str = "Subscription expired";
pub(crate) const REASON_TRIAL_EXPIRED: &str = "Trial period has ended, please upgrade your plan";

/// Outcome of a gated action check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheck {
    pub allowed: bool,
    /// Human-readable explanation, set when denied.
    pub reason: Option<String>,
}

impl PolicyCheck {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Turn a denial into [`PayflowError::PolicyDenied`].
    pub fn into_result(self) -> Result<()> {
        if self.allowed {
            Ok(())
        } else {
            Err(PayflowError::policy_denied(
                self.reason.unwrap_or_else(|| "Action not allowed".to_string()),
            ))
        }
    }
}

/// Outcome of [`can_add_employee`](super::SubscriptionLedger::can_add_employee).
///
/// `current_count` and `limit` are always filled so the UI can show
/// "3 / 5 employees" even when the check is denied for another reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeCheck {
    pub allowed: bool,
    pub reason: Option<String>,
    pub current_count: u32,
    pub limit: EmployeeLimit,
}

impl EmployeeCheck {
    pub(crate) fn from_policy(check: PolicyCheck, current_count: u32, limit: EmployeeLimit) -> Self {
        Self {
            allowed: check.allowed,
            reason: check.reason,
            current_count,
            limit,
        }
    }

    /// Turn a denial into [`PayflowError::PolicyDenied`].
    pub fn into_result(self) -> Result<()> {
        PolicyCheck {
            allowed: self.allowed,
            reason: self.reason,
        }
        .into_result()
    }
}

/// Denial reason when the employee ceiling is reached.
pub(crate) fn limit_reached_reason(max: u32) -> String {
    format!("Employee limit reached ({} employees max on your plan)", max)
}
