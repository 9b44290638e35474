/// The main error type for PayFlow operations
///
/// Policy denials from gating queries are *not* errors: `can_add_employee`
/// and friends return result structs. `PolicyDenied` is only produced by
/// the service layer when a gated command is attempted anyway.
#[derive(Debug, thiserror::Error)]
pub enum PayflowError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not allowed: {0}")]
    PolicyDenied(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote backend error: {0}")]
    Remote(String),

    #[error("Remote backend unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PayflowError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn policy_denied(msg: impl Into<String>) -> Self {
        Self::PolicyDenied(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error was caused by the caller (bad input, denied action,
    /// missing entity) rather than by the system.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::BadRequest(_)
                | Self::PolicyDenied(_)
                | Self::InvalidTransition(_)
        )
    }

    /// Check if retrying the same operation might succeed.
    ///
    /// Nothing in this crate retries automatically; this only informs the
    /// caller's UI whether offering "try again" makes sense.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type alias for PayFlow operations
pub type Result<T> = std::result::Result<T, PayflowError>;

impl From<serde_json::Error> for PayflowError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Data | Category::Eof => {
                PayflowError::Storage(format!("Corrupt stored data: {}", err))
            }
            Category::Io => PayflowError::Internal(format!("JSON serialization error: {}", err)),
        }
    }
}

impl From<std::io::Error> for PayflowError {
    fn from(err: std::io::Error) -> Self {
        PayflowError::Storage(format!("I/O error: {}", err))
    }
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for PayflowError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PayflowError::Unavailable("Request timed out".to_string())
        } else if err.is_connect() {
            PayflowError::Unavailable(format!("Connection error: {}", err))
        } else if err.is_status() {
            match err.status().map(|s| s.as_u16()) {
                Some(404) => PayflowError::NotFound("Remote resource not found".to_string()),
                Some(401) | Some(403) => {
                    PayflowError::Remote("Remote backend rejected the credentials".to_string())
                }
                Some(503) => PayflowError::Unavailable("Remote backend unavailable".to_string()),
                _ => PayflowError::Remote(format!("Upstream error: {}", err)),
            }
        } else if err.is_decode() {
            PayflowError::Remote(format!("Malformed response: {}", err))
        } else {
            PayflowError::Remote(format!("Request error: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = PayflowError::not_found("Subscription for company c1");
        assert_eq!(err.to_string(), "Not found: Subscription for company c1");
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_policy_denied_error() {
        let err = PayflowError::policy_denied("Employee limit reached");
        assert_eq!(err.to_string(), "Not allowed: Employee limit reached");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_server_errors_are_not_client_errors() {
        assert!(!PayflowError::storage("disk full").is_client_error());
        assert!(!PayflowError::remote("500").is_client_error());
        assert!(!PayflowError::internal("oops").is_client_error());
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(PayflowError::unavailable("offline").is_retryable());
        assert!(!PayflowError::remote("bad payload").is_retryable());
        assert!(!PayflowError::bad_request("x").is_retryable());
    }

    #[test]
    fn test_anyhow_error() {
        let err: PayflowError = anyhow::anyhow!("wrapped failure").into();
        assert_eq!(err.to_string(), "wrapped failure");
    }

    #[test]
    fn test_from_serde_json_syntax_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid").unwrap_err();
        let err: PayflowError = json_err.into();
        assert!(matches!(err, PayflowError::Storage(_)));
        assert!(err.to_string().contains("Corrupt stored data"));
    }

    #[test]
    fn test_from_serde_json_data_error() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Expected {
            count: u32,
        }

        let json_err = serde_json::from_str::<Expected>(r#"{"count": "five"}"#).unwrap_err();
        let err: PayflowError = json_err.into();
        assert!(matches!(err, PayflowError::Storage(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: PayflowError = io.into();
        assert!(matches!(err, PayflowError::Storage(_)));
        assert!(err.to_string().contains("read-only"));
    }
}
