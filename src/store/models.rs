//! Room and user records.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::RoomStatus;

/// Opaque per-connection identifier assigned by the transport.
pub type ConnectionId = String;

/// Unique identifier for a room.
pub type RoomId = String;

/// A two-player match session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Room {
    #[serde(rename = "RoomID")]
    room_id: RoomId,
    #[serde(rename = "Status")]
    status: RoomStatus,
    #[serde(rename = "User1ID")]
    user1_id: ConnectionId,
    #[serde(rename = "User2ID", default)]
    user2_id: ConnectionId,
    #[serde(rename = "Problem", default)]
    problem: Vec<i64>,
}

impl Room {
    /// A freshly created room holding only its creator.
    pub fn waiting(room_id: RoomId, creator: ConnectionId) -> Self {
        Self::new(room_id, RoomStatus::Waiting, creator, String::new(), Vec::new())
    }

    /// Whether a challenger has been attached.
    pub fn has_challenger(&self) -> bool {
        !self.user2_id.is_empty()
    }

    /// Whether `connection_id` is one of the stored members.
    pub fn is_member(&self, connection_id: &str) -> bool {
        !connection_id.is_empty()
            && (self.user1_id == connection_id || self.user2_id == connection_id)
    }

    /// The other member for `connection_id`.
    ///
    /// Returns `None` if `connection_id` is not a member or no challenger
    /// has joined yet.
    pub fn opponent_of(&self, connection_id: &str) -> Option<&ConnectionId> {
        if !self.is_member(connection_id) {
            return None;
        }
        let other = if self.user1_id == connection_id {
            &self.user2_id
        } else {
            &self.user1_id
        };
        (!other.is_empty()).then_some(other)
    }

    /// Non-empty member ids, creator first.
    pub fn members(&self) -> Vec<&ConnectionId> {
        [&self.user1_id, &self.user2_id]
            .into_iter()
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub(crate) fn attach(&mut self, challenger: ConnectionId, status: RoomStatus) {
        self.user2_id = challenger;
        self.status = status;
    }

    pub(crate) fn install_problem(&mut self, problem: Vec<i64>, status: RoomStatus) {
        self.problem = problem;
        self.status = status;
    }
}

/// A connection placed into a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct User {
    #[serde(rename = "ConnectionID")]
    connection_id: ConnectionId,
    #[serde(rename = "RoomID")]
    room_id: RoomId,
    #[serde(rename = "Solved", default)]
    solved: bool,
}

impl User {
    /// A member who has not solved the current problem.
    pub fn joined(connection_id: ConnectionId, room_id: RoomId) -> Self {
        Self::new(connection_id, room_id, false)
    }

    pub(crate) fn mark_solved(&mut self) {
        self.solved = true;
    }
}
