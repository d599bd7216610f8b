//! Error types for duel operations.

use derive_more::{Display, Error};
use tracing::instrument;

/// Category of a [`DuelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, strum::IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DuelErrorKind {
    /// A parameter was outside its accepted range (e.g. problem length).
    #[display("Invalid parameter")]
    InvalidParameter,
    /// A room or user record is missing for the given key.
    #[display("Not found")]
    NotFound,
    /// The submitting connection is not a member of its stored room.
    #[display("User not found")]
    UserNotFound,
    /// The room is not in a state that accepts the requested event.
    #[display("State conflict")]
    StateConflict,
    /// A store or queue call failed.
    #[display("Upstream failure")]
    Upstream,
    /// An inbound message body could not be understood.
    #[display("Malformed message")]
    MalformedMessage,
}

impl DuelErrorKind {
    /// Wire code sent to clients, e.g. `"STATE_CONFLICT"`.
    pub fn code(self) -> &'static str {
        self.into()
    }
}

/// Duel error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {} at {}:{}", kind, message, file, line)]
pub struct DuelError {
    /// Error category.
    pub kind: DuelErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DuelError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: DuelErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`DuelErrorKind::InvalidParameter`].
    #[track_caller]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(DuelErrorKind::InvalidParameter, message)
    }

    /// Shorthand for [`DuelErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DuelErrorKind::NotFound, message)
    }

    /// Shorthand for [`DuelErrorKind::UserNotFound`].
    #[track_caller]
    pub fn user_not_found(message: impl Into<String>) -> Self {
        Self::new(DuelErrorKind::UserNotFound, message)
    }

    /// Shorthand for [`DuelErrorKind::StateConflict`].
    #[track_caller]
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(DuelErrorKind::StateConflict, message)
    }

    /// Shorthand for [`DuelErrorKind::MalformedMessage`].
    #[track_caller]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DuelErrorKind::MalformedMessage, message)
    }

    /// Returns the error category.
    pub fn kind(&self) -> DuelErrorKind {
        self.kind
    }
}

impl From<crate::store::StoreError> for DuelError {
    #[track_caller]
    fn from(err: crate::store::StoreError) -> Self {
        Self::new(DuelErrorKind::Upstream, err.to_string())
    }
}

impl From<crate::queue::QueueError> for DuelError {
    #[track_caller]
    fn from(err: crate::queue::QueueError) -> Self {
        Self::new(DuelErrorKind::Upstream, err.to_string())
    }
}
