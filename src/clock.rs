//! Time source abstraction.
//!
//! Ledgers take a [`Clock`] so trial windows and payment dates can be
//! tested deterministically.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests.
#[cfg(any(test, feature = "test-helpers"))]
pub mod test {
    use super::*;
    use std::sync::{Arc, RwLock};

    /// Clock that only moves when told to.
    ///
    /// Clones share the same underlying instant.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `start`.
        #[must_use]
        pub fn at(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(RwLock::new(start)),
            }
        }

        /// Jump to an absolute instant.
        pub fn set(&self, instant: DateTime<Utc>) {
            *self.now.write().unwrap_or_else(|e| e.into_inner()) = instant;
        }

        /// Move forward (or backward, with a negative duration).
        pub fn advance(&self, by: chrono::Duration) {
            let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.read().unwrap_or_else(|e| e.into_inner())
        }
    }
}
