use crate::protocol::prompt::ConversationMessage;

/// Error type for everything that can fail before an event stream exists.
///
/// Failures inside a running stream never use this type; they arrive as
/// [`crate::protocol::events::NormalizedEvent::Error`] items instead.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Invalid prompt: {message}")]
    Prompt {
        message: String,
        prompt: Box<ConversationMessage>,
    },
    #[error("Unsupported functionality: {0}")]
    CapabilityNotSupported(String),
    #[error("No such {model_type} model: {model_id}")]
    NoSuchModel { model_id: String, model_type: String },
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category, used by hosts to pick an exit status or log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Unsupported,
    Authentication,
    Permission,
    RateLimit,
    ServerError,
    Unknown,
}

/// Map a gateway HTTP status code to an error category.
#[must_use]
pub fn category_from_upstream_status(status: u16) -> ErrorCategory {
    match status {
        400 => ErrorCategory::InvalidRequest,
        401 => ErrorCategory::Authentication,
        403 => ErrorCategory::Permission,
        429 => ErrorCategory::RateLimit,
        500..=599 => ErrorCategory::ServerError,
        _ => ErrorCategory::Unknown,
    }
}

impl BridgeError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::Prompt { .. } => ErrorCategory::InvalidRequest,
            BridgeError::CapabilityNotSupported(_) | BridgeError::NoSuchModel { .. } => {
                ErrorCategory::Unsupported
            }
            BridgeError::Upstream { status, .. } => category_from_upstream_status(*status),
            BridgeError::Transport(_) | BridgeError::Config(_) | BridgeError::Internal(_) => {
                ErrorCategory::ServerError
            }
        }
    }

    /// True when the request was rejected locally, before any network activity.
    #[must_use]
    pub fn is_pre_network(&self) -> bool {
        matches!(
            self,
            BridgeError::Prompt { .. }
                | BridgeError::CapabilityNotSupported(_)
                | BridgeError::NoSuchModel { .. }
                | BridgeError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::prompt::{ConversationMessage, Role};

    #[test]
    fn test_upstream_status_categories() {
        assert_eq!(category_from_upstream_status(401), ErrorCategory::Authentication);
        assert_eq!(category_from_upstream_status(429), ErrorCategory::RateLimit);
        assert_eq!(category_from_upstream_status(502), ErrorCategory::ServerError);
        assert_eq!(category_from_upstream_status(418), ErrorCategory::Unknown);
    }

    #[test]
    fn test_prompt_error_is_pre_network() {
        let err = BridgeError::Prompt {
            message: "Expected a user message".to_string(),
            prompt: Box::new(ConversationMessage::text(Role::Assistant, "hi")),
        };
        assert!(err.is_pre_network());
        assert_eq!(err.category(), ErrorCategory::InvalidRequest);
        assert_eq!(err.to_string(), "Invalid prompt: Expected a user message");
    }

    #[test]
    fn test_upstream_error_is_not_pre_network() {
        let err = BridgeError::Upstream {
            status: 503,
            message: "busy".to_string(),
        };
        assert!(!err.is_pre_network());
        assert_eq!(err.category(), ErrorCategory::ServerError);
    }
}
