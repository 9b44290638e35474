//! Invoice numbers (`FAC-{year}-{4 digits}`).

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{PayflowError, Result};
use crate::traits::kv::{KeyValueStore, KeyValueStoreExt};

const PREFIX: &str = "FAC";

/// Largest sequence that fits in four digits.
pub const MAX_SEQUENCE: u32 = 9999;

/// A formatted invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvoiceNumber {
    year: i32,
    sequence: u32,
}

impl InvoiceNumber {
    pub fn new(year: i32, sequence: u32) -> Result<Self> {
        if !(1..=MAX_SEQUENCE).contains(&sequence) {
            return Err(PayflowError::bad_request(format!(
                "Invoice sequence must be between 1 and {}, got {}",
                MAX_SEQUENCE, sequence
            )));
        }
        if !(1000..=9999).contains(&year) {
            return Err(PayflowError::bad_request(format!("Invalid invoice year: {}", year)));
        }
        Ok(Self { year, sequence })
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Parse `FAC-2025-0042`.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || PayflowError::bad_request(format!("Invalid invoice number: {}", s));

        let mut parts = s.trim().split('-');
        let (Some(PREFIX), Some(year), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if year.len() != 4 || seq.len() != 4 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let sequence = seq.parse().map_err(|_| invalid())?;
        Self::new(year, sequence)
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:04}", PREFIX, self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = PayflowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for InvoiceNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InvoiceNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Source of invoice numbers.
#[async_trait]
pub trait InvoiceNumberGenerator: Send + Sync {
    /// Next number for an invoice issued in `year`.
    async fn next_number(&self, year: i32) -> Result<InvoiceNumber>;
}

/// Random four-digit sequence.
///
/// Uniqueness is not guaranteed; the backend should enforce it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInvoiceNumbers;

#[async_trait]
impl InvoiceNumberGenerator for RandomInvoiceNumbers {
    async fn next_number(&self, year: i32) -> Result<InvoiceNumber> {
        let sequence = rand::thread_rng().gen_range(1..=MAX_SEQUENCE);
        InvoiceNumber::new(year, sequence)
    }
}

/// Per-year counter persisted in a key-value store.
pub struct SequentialInvoiceNumbers<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> SequentialInvoiceNumbers<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Storage key of the counter for `year`.
    #[must_use]
    pub fn key(year: i32) -> String {
        format!("payflow.invoice_sequence.{}", year)
    }

    /// Last number issued in `year` (0 if none).
    pub async fn current(&self, year: i32) -> Result<u32> {
        Ok(self.store.get(&Self::key(year)).await?.unwrap_or(0))
    }
}

#[async_trait]
impl<S: KeyValueStore> InvoiceNumberGenerator for SequentialInvoiceNumbers<S> {
    async fn next_number(&self, year: i32) -> Result<InvoiceNumber> {
        let _guard = self.lock.lock().await;
        let key = Self::key(year);
        let last: u32 = self.store.get(&key).await?.unwrap_or(0);
        if last >= MAX_SEQUENCE {
            return Err(PayflowError::internal(format!(
                "Invoice numbers exhausted for {}",
                year
            )));
        }

        let number = InvoiceNumber::new(year, last + 1)?;
        self.store.set(&key, &number.sequence()).await?;
        tracing::debug!(target: "payflow::invoicing", invoice_number = %number, "Invoice number issued");
        Ok(number)
    }
}
