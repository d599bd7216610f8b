//! JSON messages exchanged with connected clients.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::DuelError;

/// Tag carried in the `message` field of every push notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    /// The room has no challenger yet.
    PleaseWait,
    /// A problem was generated; data holds its terms.
    StartGame,
    /// The submitted answer does not reach the target.
    WrongAnswer,
    /// The submitter solved first.
    YouWin,
    /// The opponent solved first.
    YouLose,
}

/// Outbound push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Notification {
    message: Tag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<i64>>,
}

impl Notification {
    /// Creates a notification without data.
    pub fn new(message: Tag) -> Self {
        Self {
            message,
            data: None,
        }
    }

    /// `START_GAME` carrying the problem terms.
    pub fn start_game(problem: Vec<i64>) -> Self {
        Self {
            message: Tag::StartGame,
            data: Some(problem),
        }
    }

    /// Serializes the notification as a JSON text frame.
    pub fn to_json(&self) -> String {
        // A tag and an optional integer list always serialize.
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"message":"{}"}}"#, self.message))
    }
}

/// Inbound client message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// One sign token per trailing term, optionally echoing the problem.
    Answer {
        /// Sign tokens, `"p"` for add and anything else for subtract.
        answer: Vec<String>,
        /// Problem as seen by the client; informational only.
        #[serde(default)]
        problem: Option<Vec<i64>>,
    },
    /// Request for a new problem of `level` terms.
    ProblemRequest {
        /// Requested problem length.
        level: i64,
    },
}

impl ClientMessage {
    /// Parses a text frame body.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError`] with `MalformedMessage` if the body matches no known shape.
    #[instrument(skip(body), fields(len = body.len()))]
    pub fn parse(body: &str) -> Result<Self, DuelError> {
        let message = serde_json::from_str(body)
            .map_err(|e| DuelError::malformed(format!("Unrecognized message: {}", e)))?;
        debug!(?message, "Parsed client message");
        Ok(message)
    }
}

/// Error frame sent back to the client whose event failed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    error: &'static str,
    message: String,
}

impl From<&DuelError> for ErrorReply {
    fn from(err: &DuelError) -> Self {
        Self {
            error: err.kind().code(),
            message: err.message.clone(),
        }
    }
}

impl ErrorReply {
    /// Serializes the reply as a JSON text frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, self.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DuelErrorKind;

    #[test]
    fn notification_without_data_omits_field() {
        let json = Notification::new(Tag::PleaseWait).to_json();
        assert_eq!(json, r#"{"message":"PLEASE_WAIT"}"#);
    }

    #[test]
    fn start_game_carries_terms() {
        let json = Notification::start_game(vec![10, 3, 5]).to_json();
        assert_eq!(json, r#"{"message":"START_GAME","data":[10,3,5]}"#);
    }

    #[test]
    fn parses_problem_request() {
        let msg = ClientMessage::parse(r#"{"level": 3}"#).expect("parse");
        assert_eq!(msg, ClientMessage::ProblemRequest { level: 3 });
    }

    #[test]
    fn parses_answer_with_and_without_problem() {
        let msg = ClientMessage::parse(r#"{"answer": ["p", "m"]}"#).expect("parse");
        assert_eq!(
            msg,
            ClientMessage::Answer {
                answer: vec!["p".into(), "m".into()],
                problem: None
            }
        );

        let msg = ClientMessage::parse(r#"{"problem": [10, 3, 5], "answer": ["m", "m"]}"#)
            .expect("parse");
        assert!(matches!(msg, ClientMessage::Answer { problem: Some(_), .. }));
    }

    #[test]
    fn rejects_unknown_shape() {
        let err = ClientMessage::parse(r#"{"move": 4}"#).expect_err("should fail");
        assert_eq!(err.kind(), DuelErrorKind::MalformedMessage);
    }
}
