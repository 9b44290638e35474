use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::billing::DEFAULT_TRIAL_DAYS;
use crate::error::{PayflowError, Result};
use crate::invoicing::DEFAULT_DUE_DAYS;
use crate::utils::{get_env_with_prefix, get_non_empty_env};

/// Main configuration for PayFlow
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub payroll: PayrollConfig,
}

impl Config {
    /// Shorthand for `ConfigBuilder::new().from_env().build()`.
    pub fn from_env() -> Result<Self> {
        ConfigBuilder::new().from_env().build()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Remote backend credentials.
///
/// Both `url` and `key` must be set for the remote backend to be used;
/// otherwise PayFlow runs local-only.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECONDS),
        }
    }
}

impl BackendConfig {
    /// Whether both URL and key are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let has_url = self.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let has_key = self
            .key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty());
        has_url && has_key
    }
}

/// Where ledgers persist their state.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory for the JSON file store; `None` keeps state in memory only.
    pub dir: Option<PathBuf>,
}

/// How invoice numbers are allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceNumbering {
    /// Random four-digit sequence.
    #[default]
    Random,
    /// Durable per-year counter.
    Sequential,
}

impl FromStr for InvoiceNumbering {
    type Err = PayflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            other => Err(PayflowError::bad_request(format!(
                "Invoice numbering must be 'random' or 'sequential', got: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayrollConfig {
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,
    #[serde(default = "default_invoice_due_days")]
    pub invoice_due_days: u32,
    #[serde(default)]
    pub invoice_numbering: InvoiceNumbering,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            invoice_due_days: default_invoice_due_days(),
            invoice_numbering: InvoiceNumbering::default(),
        }
    }
}

const DEFAULT_BACKEND_TIMEOUT_SECONDS: u64 = 30;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_trial_days() -> u32 {
    DEFAULT_TRIAL_DAYS
}

fn default_invoice_due_days() -> u32 {
    DEFAULT_DUE_DAYS
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
    invalid: Option<PayflowError>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            invalid: None,
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_backend(mut self, url: impl Into<String>, key: impl Into<SecretString>) -> Self {
        self.config.backend.url = Some(url.into());
        self.config.backend.key = Some(key.into());
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.config.backend.timeout = timeout;
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage.dir = Some(dir.into());
        self
    }

    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.config.payroll.trial_days = days;
        self
    }

    pub fn with_invoice_due_days(mut self, days: u32) -> Self {
        self.config.payroll.invoice_due_days = days;
        self
    }

    pub fn with_invoice_numbering(mut self, numbering: InvoiceNumbering) -> Self {
        self.config.payroll.invoice_numbering = numbering;
        self
    }

    /// Overlay values from `PAYFLOW_*` environment variables (bare names as fallback).
    ///
    /// Unparsable numbers are ignored; an unknown numbering mode fails `build()`.
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        if let Some(url) = get_non_empty_env("BACKEND_URL") {
            self.config.backend.url = Some(url);
        }
        if let Some(key) = get_non_empty_env("BACKEND_KEY") {
            self.config.backend.key = Some(SecretString::from(key));
        }
        if let Some(secs) = get_env_with_prefix("BACKEND_TIMEOUT_SECONDS") {
            if let Ok(secs) = secs.parse() {
                self.config.backend.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(dir) = get_non_empty_env("STORAGE_DIR") {
            self.config.storage.dir = Some(PathBuf::from(dir));
        }

        if let Some(days) = get_env_with_prefix("TRIAL_DAYS") {
            if let Ok(days) = days.parse() {
                self.config.payroll.trial_days = days;
            }
        }
        if let Some(days) = get_env_with_prefix("INVOICE_DUE_DAYS") {
            if let Ok(days) = days.parse() {
                self.config.payroll.invoice_due_days = days;
            }
        }
        if let Some(numbering) = get_env_with_prefix("INVOICE_NUMBERING") {
            match numbering.parse() {
                Ok(numbering) => self.config.payroll.invoice_numbering = numbering,
                Err(err) => self.invalid = Some(err),
            }
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// Missing backend credentials are not an error: they select
    /// local-only mode.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Invalid log level
    /// - Backend URL without an http(s) scheme
    /// - Zero backend timeout
    /// - Zero trial length
    /// - Unknown invoice numbering mode
    pub fn build(self) -> Result<Config> {
        if let Some(err) = self.invalid {
            return Err(err);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(PayflowError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if let Some(url) = self.config.backend.url.as_deref() {
            let url = url.trim();
            if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(PayflowError::bad_request(format!(
                    "Backend URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.config.backend.timeout.is_zero() {
            return Err(PayflowError::bad_request(
                "Backend timeout must be greater than 0",
            ));
        }

        if self.config.payroll.trial_days == 0 {
            return Err(PayflowError::bad_request(
                "Trial length must be at least 1 day",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.backend.is_configured());
        assert!(config.storage.dir.is_none());
        assert_eq!(config.payroll.trial_days, 14);
        assert_eq!(config.payroll.invoice_due_days, 15);
        assert_eq!(config.payroll.invoice_numbering, InvoiceNumbering::Random);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_log_level("debug")
            .with_backend("https://db.example.com", "anon-key")
            .with_backend_timeout(Duration::from_secs(5))
            .with_invoice_numbering(InvoiceNumbering::Sequential)
            .with_trial_days(30)
            .build()
            .unwrap();

        assert!(config.backend.is_configured());
        assert_eq!(config.backend.timeout, Duration::from_secs(5));
        assert_eq!(config.payroll.trial_days, 30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ConfigBuilder::new().with_log_level("loud").build().is_err());
        assert!(ConfigBuilder::new().with_trial_days(0).build().is_err());
        assert!(ConfigBuilder::new()
            .with_backend_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(ConfigBuilder::new()
            .with_backend("db.example.com", "anon-key")
            .build()
            .is_err());
    }

    #[test]
    fn test_url_without_key_is_local_only() {
        let mut config = ConfigBuilder::new().build().unwrap();
        config.backend.url = Some("https://db.example.com".to_string());
        assert!(!config.backend.is_configured());
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ConfigBuilder::new()
            .with_backend("https://db.example.com", "very-secret-key")
            .build()
            .unwrap();
        assert!(!format!("{:?}", config).contains("very-secret-key"));
    }

    #[test]
    fn test_invoice_numbering_parse() {
        assert_eq!("Sequential".parse::<InvoiceNumbering>().unwrap(), InvoiceNumbering::Sequential);
        assert!("counter".parse::<InvoiceNumbering>().is_err());
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("PAYFLOW_TRIAL_DAYS", "21");
            std::env::set_var("PAYFLOW_INVOICE_DUE_DAYS", "30");
            std::env::set_var("PAYFLOW_STORAGE_DIR", "/tmp/payflow-config-test");
        }

        let config = ConfigBuilder::new().from_env().build().unwrap();
        assert_eq!(config.payroll.trial_days, 21);
        assert_eq!(config.payroll.invoice_due_days, 30);
        assert_eq!(
            config.storage.dir,
            Some(PathBuf::from("/tmp/payflow-config-test"))
        );

        unsafe {
            std::env::remove_var("PAYFLOW_TRIAL_DAYS");
            std::env::remove_var("PAYFLOW_INVOICE_DUE_DAYS");
            std::env::remove_var("PAYFLOW_STORAGE_DIR");
        }

        // unknown numbering mode is reported by build()
        unsafe {
            std::env::set_var("PAYFLOW_INVOICE_NUMBERING", "counter");
        }
        let result = ConfigBuilder::new().from_env().build();
        unsafe {
            std::env::remove_var("PAYFLOW_INVOICE_NUMBERING");
        }
        assert!(result.is_err());
    }
}
