//! Audit logging for subscription and roster operations.
//!
//! Every ledger command reports what it changed through a
//! [`BillingAuditLogger`]. The default logger writes to `tracing`.

use std::fmt;

use super::plans::PlanTier;
use super::subscription::SubscriptionStatus;

/// Audit event types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingAuditEvent {
    /// Trial subscription started.
    TrialStarted { company_id: String, trial_days: u32 },
    /// Subscription record written as given.
    SubscriptionSet {
        company_id: String,
        plan: PlanTier,
        status: SubscriptionStatus,
    },
    /// Plan changed (simulated payment).
    PlanUpgraded {
        company_id: String,
        from: PlanTier,
        to: PlanTier,
    },
    /// Subscription cancelled.
    SubscriptionCancelled { company_id: String },
    /// Employee count changed.
    EmployeeCountUpdated {
        company_id: String,
        previous: u32,
        current: u32,
    },
    /// A gated action was refused.
    ActionDenied {
        company_id: String,
        action: &'static str,
        reason: String,
    },
    /// A company or employee was soft-deleted.
    EntityDeleted {
        deletion_id: String,
        entity_type: String,
    },
    /// A deleted company or employee was restored.
    EntityRestored {
        deletion_id: String,
        entity_type: String,
    },
    /// All subscription state dropped (logout).
    LedgerCleared,
}

impl fmt::Display for BillingAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrialStarted { company_id, trial_days } => {
                write!(f, "Trial started: company={}, days={}", company_id, trial_days)
            }
            Self::SubscriptionSet { company_id, plan, status } => {
                write!(f, "Subscription set: company={}, plan={}, status={}", company_id, plan, status)
            }
            Self::PlanUpgraded { company_id, from, to } => {
                write!(f, "Plan upgraded: company={}, from={}, to={}", company_id, from, to)
            }
            Self::SubscriptionCancelled { company_id } => {
                write!(f, "Subscription cancelled: company={}", company_id)
            }
            Self::EmployeeCountUpdated { company_id, previous, current } => {
                write!(f, "Employee count updated: company={}, {} -> {}", company_id, previous, current)
            }
            Self::ActionDenied { company_id, action, reason } => {
                write!(f, "Action denied: company={}, action={}, reason={}", company_id, action, reason)
            }
            Self::EntityDeleted { deletion_id, entity_type } => {
                write!(f, "Entity deleted: record={}, type={}", deletion_id, entity_type)
            }
            Self::EntityRestored { deletion_id, entity_type } => {
                write!(f, "Entity restored: record={}, type={}", deletion_id, entity_type)
            }
            Self::LedgerCleared => write!(f, "Subscription ledger cleared"),
        }
    }
}

/// Trait for audit logging backends.
#[allow(async_fn_in_trait)]
pub trait BillingAuditLogger: Send + Sync {
    /// Log an audit event.
    ///
    /// Must not fail: a broken audit sink never blocks a command.
    async fn log(&self, event: BillingAuditEvent);
}

/// Audit logger that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl BillingAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: BillingAuditEvent) {}
}

/// Logs audit events through `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl BillingAuditLogger for TracingAuditLogger {
    async fn log(&self, event: BillingAuditEvent) {
        tracing::info!(
            target: "payflow::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Event kind as a string for structured logging.
fn event_kind(event: &BillingAuditEvent) -> &'static str {
    match event {
        BillingAuditEvent::TrialStarted { .. } => "trial_started",
        BillingAuditEvent::SubscriptionSet { .. } => "subscription_set",
        BillingAuditEvent::PlanUpgraded { .. } => "plan_upgraded",
        BillingAuditEvent::SubscriptionCancelled { .. } => "subscription_cancelled",
        BillingAuditEvent::EmployeeCountUpdated { .. } => "employee_count_updated",
        BillingAuditEvent::ActionDenied { .. } => "action_denied",
        BillingAuditEvent::EntityDeleted { .. } => "entity_deleted",
        BillingAuditEvent::EntityRestored { .. } => "entity_restored",
        BillingAuditEvent::LedgerCleared => "ledger_cleared",
    }
}

/// Capturing logger for tests.
#[cfg(any(test, feature = "test-helpers"))]
pub mod test {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Audit logger that records every event. Clones share the buffer.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingAuditLogger {
        events: Arc<Mutex<Vec<BillingAuditEvent>>>,
    }

    impl RecordingAuditLogger {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn events(&self) -> Vec<BillingAuditEvent> {
            self.events.lock().await.clone()
        }
    }

    impl BillingAuditLogger for RecordingAuditLogger {
        async fn log(&self, event: BillingAuditEvent) {
            self.events.lock().await.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::RecordingAuditLogger;
    use super::*;

    #[tokio::test]
    async fn test_noop_logger() {
        NoOpAuditLogger
            .log(BillingAuditEvent::SubscriptionCancelled {
                company_id: "company_a".to_string(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_recording_logger() {
        let logger = RecordingAuditLogger::new();
        let shared = logger.clone();

        logger
            .log(BillingAuditEvent::TrialStarted {
                company_id: "company_a".to_string(),
                trial_days: 14,
            })
            .await;
        logger
            .log(BillingAuditEvent::PlanUpgraded {
                company_id: "company_a".to_string(),
                from: PlanTier::Trial,
                to: PlanTier::Starter,
            })
            .await;

        let events = shared.events().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], BillingAuditEvent::TrialStarted { .. }));
        assert!(matches!(events[1], BillingAuditEvent::PlanUpgraded { .. }));
    }

    #[test]
    fn test_event_display() {
        let event = BillingAuditEvent::EmployeeCountUpdated {
            company_id: "company_a".to_string(),
            previous: 4,
            current: 5,
        };
        let display = event.to_string();
        assert!(display.contains("company_a"));
        assert!(display.contains("4 -> 5"));

        let upgraded = BillingAuditEvent::PlanUpgraded {
            company_id: "company_a".to_string(),
            from: PlanTier::Trial,
            to: PlanTier::Professional,
        };
        assert!(upgraded.to_string().contains("to=professional"));
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(event_kind(&BillingAuditEvent::LedgerCleared), "ledger_cleared");
        assert_eq!(
            event_kind(&BillingAuditEvent::ActionDenied {
                company_id: String::new(),
                action: "add_employee",
                reason: String::new(),
            }),
            "action_denied"
        );
    }
}
