//! Rows of the relational backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role of a company in the payroll relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyKind {
    /// Payroll provider, employer of record ("Company A").
    Provider,
    /// Client hosting employees ("Company B").
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub kind: CompanyKind,
    /// Provider a client company belongs to.
    pub provider_id: Option<String>,
    pub siret: Option<String>,
    pub email: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Company {
    #[must_use]
    pub fn provider(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind: CompanyKind::Provider,
            provider_id: None,
            siret: None,
            email: None,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn client(name: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            kind: CompanyKind::Client,
            provider_id: Some(provider_id.into()),
            ..Self::provider(name)
        }
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    /// Employer of record.
    pub company_id: String,
    /// Client company the employee works at, if placed.
    pub client_company_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: Option<String>,
    pub hourly_rate: Decimal,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Employee {
    #[must_use]
    pub fn new(
        company_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        hourly_rate: Decimal,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: company_id.into(),
            client_company_id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            position: None,
            hourly_rate,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn placed_at(mut self, client_company_id: impl Into<String>) -> Self {
        self.client_company_id = Some(client_company_id.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationRole {
    Client,
    Employee,
}

/// Invitation for a client company or employee to join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    /// Inviting company.
    pub company_id: String,
    pub email: String,
    pub role: InvitationRole,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// New pending invitation with a random token.
    #[must_use]
    pub fn new(
        company_id: impl Into<String>,
        email: impl Into<String>,
        role: InvitationRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: company_id.into(),
            email: email.into(),
            role,
            token: uuid::Uuid::new_v4().simple().to_string(),
            created_at: now,
            accepted_at: None,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.accepted_at.is_none()
    }
}
