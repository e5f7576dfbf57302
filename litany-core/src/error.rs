use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host-level errors produced by litany-core.
#[derive(Debug, Error)]
pub enum LitanyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("session driver is gone, command channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LitanyError>;

/// Errors recorded in a session's error slot.
///
/// These never propagate out of the session: they are captured as state
/// (last error wins) and surfaced through snapshots and status events.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SessionError {
    /// No recognition capability in this environment.
    #[error("speech recognition is not supported in this environment")]
    EngineUnsupported,

    /// The user declined audio capture.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Mid-session failure reported by the recognizer.
    #[error("recognizer error: {code}{}", .message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default())]
    EngineTransientFailure {
        code: String,
        message: Option<String>,
    },

    /// The recognizer refused to start.
    #[error("unable to start listening: {message}")]
    StartFailure { message: String },
}

impl SessionError {
    /// Map a recognizer error code onto a session error kind.
    pub fn from_code(code: &str, message: Option<String>) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "not-allowed" | "service-not-allowed" | "permission-denied" => {
                SessionError::PermissionDenied
            }
            "unsupported" | "language-not-supported" => SessionError::EngineUnsupported,
            other => SessionError::EngineTransientFailure {
                code: other.to_string(),
                message,
            },
        }
    }

    /// Unsupported and permission errors end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionError::EngineUnsupported | SessionError::PermissionDenied
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_codes_map_to_terminal_errors() {
        let err = SessionError::from_code("not-allowed", None);
        assert_eq!(err, SessionError::PermissionDenied);
        assert!(err.is_terminal());
        assert!(SessionError::from_code("language-not-supported", None).is_terminal());
    }

    #[test]
    fn unknown_codes_are_transient() {
        let err = SessionError::from_code("network", Some("offline".into()));
        assert!(!err.is_terminal());
        assert_eq!(err.to_string(), "recognizer error: network (offline)");
    }

    #[test]
    fn session_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(SessionError::StartFailure {
            message: "busy".into(),
        })
        .expect("serialize session error");
        assert_eq!(json["kind"], "startFailure");
        assert_eq!(json["message"], "busy");
    }
}
