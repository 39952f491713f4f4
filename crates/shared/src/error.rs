use thiserror::Error;

use crate::domain::{ConnectionId, Role};

/// Log category of a dropped message. Stable across releases so log
/// filters can key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnknownRole,
    UnregisteredSender,
    MalformedPayload,
    UnhandledEventKind,
    UnknownPhase,
    NoRecipients,
    UnknownEvent,
    Decode,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnknownRole => "unknown_role",
            ErrorCode::UnregisteredSender => "unregistered_sender",
            ErrorCode::MalformedPayload => "malformed_payload",
            ErrorCode::UnhandledEventKind => "unhandled_event_kind",
            ErrorCode::UnknownPhase => "unknown_phase",
            ErrorCode::NoRecipients => "no_recipients",
            ErrorCode::UnknownEvent => "unknown_event",
            ErrorCode::Decode => "decode",
        }
    }
}

/// Every way an inbound message can fail to produce a delivery.
///
/// None of these are fatal: they are logged where they are detected and the
/// offending message is discarded. Nothing is reported back to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("unknown role hint {hint:?} from connection {connection_id}")]
    UnknownRole {
        connection_id: ConnectionId,
        hint: String,
    },
    #[error("control event from connection {connection_id} with role {role:?}")]
    UnregisteredSender {
        connection_id: ConnectionId,
        /// `None` when the registry has no record of the connection at all.
        role: Option<Role>,
    },
    #[error("malformed control payload: {reason}")]
    MalformedPayload { reason: String },
    #[error("unhandled event kind {kind}")]
    UnhandledEventKind { kind: String },
    #[error("unknown input event phase {phase:?}")]
    UnknownPhase { phase: String },
    #[error("no actuator connected to receive the command")]
    NoRecipients,
    #[error("unknown frame event {event:?}")]
    UnknownEvent { event: String },
    #[error("undecodable frame: {reason}")]
    Decode { reason: String },
}

impl RelayError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RelayError::UnknownRole { .. } => ErrorCode::UnknownRole,
            RelayError::UnregisteredSender { .. } => ErrorCode::UnregisteredSender,
            RelayError::MalformedPayload { .. } => ErrorCode::MalformedPayload,
            RelayError::UnhandledEventKind { .. } => ErrorCode::UnhandledEventKind,
            RelayError::UnknownPhase { .. } => ErrorCode::UnknownPhase,
            RelayError::NoRecipients => ErrorCode::NoRecipients,
            RelayError::UnknownEvent { .. } => ErrorCode::UnknownEvent,
            RelayError::Decode { .. } => ErrorCode::Decode,
        }
    }
}
