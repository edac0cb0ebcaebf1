//! Error types for menuda-core
//!
//! Every failure in the front-end is caught where it happens and shown as a
//! toast, so besides the usual code/severity pair each error knows the short
//! message that ends up on screen.

use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No usable user profile in the session
    Unauthorized,
    /// Form input rejected before any request was made
    ValidationError,
    /// Transport failure talking to the backend
    NetworkError,
    /// Backend answered with a non-2xx status
    HttpStatus,
    /// Backend envelope carried `status != "success"`
    BackendError,
    /// Response body could not be decoded
    DecodeError,
    /// Initial load exceeded its deadline
    Timeout,
    /// Identity token could not be decoded
    InvalidToken,
    /// Session file could not be read or written
    StorageError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::NetworkError => write!(f, "NETWORK_ERROR"),
            ErrorCode::HttpStatus => write!(f, "HTTP_STATUS"),
            ErrorCode::BackendError => write!(f, "BACKEND_ERROR"),
            ErrorCode::DecodeError => write!(f, "DECODE_ERROR"),
            ErrorCode::Timeout => write!(f, "TIMEOUT"),
            ErrorCode::InvalidToken => write!(f, "INVALID_TOKEN"),
            ErrorCode::StorageError => write!(f, "STORAGE_ERROR"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            suggestions: vec![],
        }
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Main error type for menuda-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("User profile not found")]
    Unauthorized,

    #[error("{message}")]
    Validation { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server responded with status: {status}")]
    Status { status: u16, message: String },

    #[error("{message}")]
    Backend { message: String },

    #[error("Invalid response: {message}")]
    Decode { message: String },

    #[error("Request timed out. Please check your connection and try again.")]
    Timeout,

    #[error("Invalid identity token: {message}")]
    InvalidToken { message: String },

    #[error("Session storage error: {message}")]
    Storage { message: String },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation { message: message.into() }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Unauthorized => ErrorCode::Unauthorized,
            CoreError::Validation { .. } => ErrorCode::ValidationError,
            CoreError::Network { .. } => ErrorCode::NetworkError,
            CoreError::Status { .. } => ErrorCode::HttpStatus,
            CoreError::Backend { .. } => ErrorCode::BackendError,
            CoreError::Decode { .. } => ErrorCode::DecodeError,
            CoreError::Timeout => ErrorCode::Timeout,
            CoreError::InvalidToken { .. } => ErrorCode::InvalidToken,
            CoreError::Storage { .. } => ErrorCode::StorageError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::Unauthorized => ErrorSeverity::Info,
            CoreError::Validation { .. } => ErrorSeverity::Warning,
            CoreError::Timeout => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether a read that failed this way is worth repeating
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Network { .. } | CoreError::Timeout => true,
            CoreError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Text for the toast notification; a backend message wins over the bare status
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => self.to_string(),
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::Unauthorized => {
                details = details.with_suggestion("Sign in again to restore your profile.".to_string());
            }
            CoreError::Network { .. } | CoreError::Timeout => {
                details = details.with_suggestion(
                    "Check that the Menuda API is running and reachable.".to_string(),
                );
            }
            CoreError::Status { message, .. } if !message.is_empty() => {
                details = details.with_suggestion(format!("Backend said: {}", message));
            }
            CoreError::Storage { .. } => {
                details = details.with_suggestion(
                    "Ensure the session file directory is writable.".to_string(),
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<reqwest::Error> for CoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            CoreError::Timeout
        } else if error.is_decode() {
            CoreError::Decode { message: error.to_string() }
        } else if let Some(status) = error.status() {
            CoreError::Status { status: status.as_u16(), message: String::new() }
        } else {
            CoreError::Network { message: error.to_string() }
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::Decode { message: error.to_string() }
    }
}

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// User ID (if signed in)
    pub user_id: Option<String>,
    /// Operation being performed
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    /// Log a warning
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Error => log::error!(
                target: "menuda::error",
                "{} - Operation: {} - User: {:?}",
                error.to_details(),
                context.operation,
                context.user_id
            ),
            _ => log::warn!(
                target: "menuda::error",
                "{} - Operation: {} - User: {:?}",
                error.to_details(),
                context.operation,
                context.user_id
            ),
        }
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "menuda::error",
            "WARNING: {} - Operation: {} - User: {:?}",
            message,
            context.operation,
            context.user_id
        );
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Unauthorized.to_string(), "UNAUTHORIZED");
        assert_eq!(ErrorCode::HttpStatus.to_string(), "HTTP_STATUS");
        assert_eq!(ErrorCode::Timeout.to_string(), "TIMEOUT");
    }

    #[test]
    fn test_core_error_code_and_severity() {
        assert_eq!(CoreError::Unauthorized.code(), ErrorCode::Unauthorized);
        assert_eq!(CoreError::validation("x").severity(), ErrorSeverity::Warning);
        assert_eq!(
            CoreError::Network { message: "refused".to_string() }.severity(),
            ErrorSeverity::Error
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            CoreError::validation("New category name is required").user_message(),
            "New category name is required"
        );
        assert_eq!(
            CoreError::Timeout.user_message(),
            "Request timed out. Please check your connection and try again."
        );
        assert_eq!(
            CoreError::Status { status: 503, message: String::new() }.user_message(),
            "Server responded with status: 503"
        );
        assert_eq!(
            CoreError::Status { status: 404, message: "Transaction not found".to_string() }
                .user_message(),
            "Transaction not found"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CoreError::Network { message: String::new() }.is_retryable());
        assert!(CoreError::Status { status: 502, message: String::new() }.is_retryable());
        assert!(!CoreError::Status { status: 404, message: String::new() }.is_retryable());
        assert!(!CoreError::Backend { message: "nope".to_string() }.is_retryable());
    }

    #[test]
    fn test_error_details_suggestions() {
        let details = CoreError::Unauthorized.to_details();
        assert_eq!(details.code, ErrorCode::Unauthorized);
        assert!(!details.suggestions.is_empty());
        assert!(details.to_string().contains("[UNAUTHORIZED]"));
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::new("save_transaction").with_user_id("user-456");
        assert_eq!(context.operation, "save_transaction");
        assert_eq!(context.user_id, Some("user-456".to_string()));
    }
}
