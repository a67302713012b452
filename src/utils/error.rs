use crate::domain::model::Selector;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Backend '{selector}' unavailable: {source}")]
    BackendUnavailable {
        selector: Selector,
        #[source]
        source: ProviderError,
    },

    #[error("Observation failed: {message}")]
    ObservationError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error in {field}: {message}")]
    ConfigParseError { field: String, message: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required config: {field}")]
    MissingConfigError { field: String },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

/// 後端供應者自身的失敗，由 Router 加上 selector 後轉為 `BackendUnavailable`
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Client,
    Configuration,
    Backend,
    Observability,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RouterError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } => ErrorCategory::Client,
            Self::ConfigurationError { .. }
            | Self::ConfigParseError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::BackendUnavailable { .. } => ErrorCategory::Backend,
            Self::ObservationError { .. } => ErrorCategory::Observability,
            Self::IoError(_) | Self::ServerError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Observability => ErrorSeverity::Low,
            ErrorCategory::Client | ErrorCategory::Backend => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ValidationError { .. } => {
                "Pass a non-empty customer id without control characters".to_string()
            }
            Self::ConfigurationError { .. } | Self::MissingConfigError { .. } => {
                "Register a backend for every selector the routing policy can produce".to_string()
            }
            Self::ConfigParseError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the TOML configuration file syntax and values".to_string()
            }
            Self::BackendUnavailable { selector, .. } => {
                format!("Check the health of the '{}' backend", selector)
            }
            Self::ObservationError { .. } => "No action needed; the request was served".to_string(),
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::ServerError { .. } => "Check that the bind address is free".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Client => format!("Invalid request: {}", self),
            ErrorCategory::Configuration => format!("Router is misconfigured: {}", self),
            ErrorCategory::Backend => format!("Backend failure: {}", self),
            ErrorCategory::Observability => format!("Migration metrics degraded: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_carries_selector() {
        let err = RouterError::BackendUnavailable {
            selector: Selector::modern(),
            source: ProviderError::Timeout { elapsed_ms: 50 },
        };
        assert_eq!(err.category(), ErrorCategory::Backend);
        assert!(err.to_string().contains("modern"));
        assert!(err.recovery_suggestion().contains("modern"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(RouterError::configuration("x").severity() > RouterError::validation("x").severity());
        let observation = RouterError::ObservationError {
            message: "sink closed".to_string(),
        };
        assert_eq!(observation.severity(), ErrorSeverity::Low);
    }
}
