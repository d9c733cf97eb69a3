//! Unified error types for the funnel engine.
//!
//! Error codes:
//! - EVENT_001: Structurally invalid event
//! - SESSION_001: Session lookup failed
//! - GOAL_001: Conversion goal lookup failed

use thiserror::Error;

use crate::events::RawConversionEvent;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coded error kinds that form the engine's public error surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// EVENT_001: Event is missing a required field or fails validation
    InvalidEvent,
    /// SESSION_001: Session could not be resolved
    SessionNotFound,
    /// GOAL_001: Conversion goal could not be resolved
    ConversionGoalNotFound,
}

impl ErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEvent => "EVENT_001",
            Self::SessionNotFound => "SESSION_001",
            Self::ConversionGoalNotFound => "GOAL_001",
        }
    }
}

/// Unified error type for the funnel engine.
#[derive(Debug, Error)]
pub enum Error {
    /// An event failed the validation gate. Carries the partial event.
    #[error("[EVENT_001] invalid event: {reason}")]
    InvalidEvent {
        event: Box<RawConversionEvent>,
        reason: String,
    },

    #[error("[SESSION_001] session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("[GOAL_001] conversion goal not found: {goal_id}")]
    ConversionGoalNotFound { goal_id: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid event error from the partial event and a reason.
    pub fn invalid_event(event: RawConversionEvent, reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            event: Box::new(event),
            reason: reason.into(),
        }
    }

    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    pub fn goal_not_found(goal_id: impl Into<String>) -> Self {
        Self::ConversionGoalNotFound {
            goal_id: goal_id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Get the coded kind if this is a coded error.
    pub fn kind(&self) -> Option<ErrorCode> {
        match self {
            Self::InvalidEvent { .. } => Some(ErrorCode::InvalidEvent),
            Self::SessionNotFound { .. } => Some(ErrorCode::SessionNotFound),
            Self::ConversionGoalNotFound { .. } => Some(ErrorCode::ConversionGoalNotFound),
            _ => None,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        self.kind().map(|k| k.code())
    }
}
