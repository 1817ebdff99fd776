//! Errors raised while talking to Authress.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthressError {
    /// The configured service client access key cannot be used.
    #[error("service client access key is invalid: {0}")]
    InvalidAccessKey(String),

    /// A user token failed verification.
    #[error("token verification failed: {reason}")]
    TokenVerification { reason: String },

    /// The user does not hold the permission on the resource.
    #[error("user '{user_id}' does not have '{permission}' on '{resource_uri}'")]
    Unauthorized {
        user_id: String,
        resource_uri: String,
        permission: String,
    },

    /// Authress answered with a non-success status.
    #[error("authress responded with {status}: {message}")]
    Api { status: u16, message: String },

    #[error("authress request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid authress url: {0}")]
    InvalidUrl(String),
}

impl AuthressError {
    pub fn token(reason: impl Into<String>) -> Self {
        Self::TokenVerification {
            reason: reason.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Api {
            status: 404,
            message: message.into(),
        }
    }

    /// HTTP status reported by Authress, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Stable error code, surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAccessKey(_) => "InvalidAccessKeyError",
            Self::TokenVerification { .. } => "TokenVerificationError",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::Api { .. } => "ApiError",
            Self::Transport(_) => "TransportError",
            Self::InvalidUrl(_) => "InvalidUrlError",
        }
    }

    /// Short machine-readable reason, if the error carries one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::TokenVerification { reason } => Some(reason),
            Self::InvalidAccessKey(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected_from_status() {
        assert!(AuthressError::not_found("gone").is_not_found());
        assert!(!AuthressError::token("bad").is_not_found());
        assert_eq!(AuthressError::token("bad").code(), "TokenVerificationError");
    }
}
