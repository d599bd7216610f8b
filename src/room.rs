//! Room lifecycle: status transitions, problem requests and teardown.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::problem;
use crate::{DuelError, Gateway, Notification, Room, RoomStore, Tag, User, UserStore};

/// Status of a room.
///
/// `Waiting → Preparing → Playing`; a room leaves the machine by being
/// deleted. All transition checks live on this type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RoomStatus {
    /// Creator present, waiting for a challenger.
    Waiting,
    /// Both members present, no problem yet.
    Preparing,
    /// Problem issued, answers accepted.
    Playing,
}

/// What a problem request may do in the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemGate {
    /// No challenger yet; tell the requester to wait.
    Wait,
    /// Generate a problem and move to `next`.
    Generate {
        /// Status after the problem is stored.
        next: RoomStatus,
    },
}

impl RoomStatus {
    /// Transition taken when a challenger is attached.
    ///
    /// # Errors
    ///
    /// `StateConflict` unless the room is waiting.
    pub fn challenger_joined(self) -> Result<RoomStatus, DuelError> {
        match self {
            RoomStatus::Waiting => Ok(RoomStatus::Preparing),
            other => Err(DuelError::state_conflict(format!(
                "Room is {}, cannot take a challenger",
                other
            ))),
        }
    }

    /// Decision for a problem request.
    ///
    /// # Errors
    ///
    /// `StateConflict` if a problem is already in play.
    pub fn problem_requested(self) -> Result<ProblemGate, DuelError> {
        match self {
            RoomStatus::Waiting => Ok(ProblemGate::Wait),
            RoomStatus::Preparing => Ok(ProblemGate::Generate {
                next: RoomStatus::Playing,
            }),
            RoomStatus::Playing => Err(DuelError::state_conflict(
                "A problem is already in play",
            )),
        }
    }

    /// Checks that answers may be submitted.
    ///
    /// # Errors
    ///
    /// `StateConflict` unless the room is playing.
    pub fn accepts_answers(self) -> Result<(), DuelError> {
        match self {
            RoomStatus::Playing => Ok(()),
            other => Err(DuelError::state_conflict(format!(
                "Room is {}, answers are not accepted",
                other
            ))),
        }
    }
}

/// Result of a problem request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemOutcome {
    /// Requester was told to wait.
    PleaseWait,
    /// Problem stored and sent to both members.
    Started(Vec<i64>),
}

/// Drives rooms through problem requests and teardown.
#[derive(Debug, Clone)]
pub struct RoomLifecycle {
    rooms: Arc<dyn RoomStore>,
    users: Arc<dyn UserStore>,
    gateway: Arc<dyn Gateway>,
}

impl RoomLifecycle {
    /// Creates a lifecycle driver over the given handles.
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        users: Arc<dyn UserStore>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        Self {
            rooms,
            users,
            gateway,
        }
    }

    /// Loads the room `connection_id` belongs to.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user or its room is missing, `Upstream` on store failure.
    #[instrument(skip(self))]
    pub async fn room_of(&self, connection_id: &str) -> Result<Room, DuelError> {
        self.member_of(connection_id).await.map(|(_, room)| room)
    }

    /// Loads the user record for `connection_id` together with its room.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user or its room is missing, `Upstream` on store failure.
    pub async fn member_of(&self, connection_id: &str) -> Result<(User, Room), DuelError> {
        let user = self
            .users
            .get_user(connection_id)
            .await?
            .ok_or_else(|| DuelError::not_found(format!("User {} does not exist", connection_id)))?;

        let room = self
            .rooms
            .get_room(user.room_id())
            .await?
            .ok_or_else(|| DuelError::not_found(format!("Room {} does not exist", user.room_id())))?;
        Ok((user, room))
    }

    /// Handles a problem request of `level` terms from `connection_id`.
    ///
    /// In a waiting room the requester alone gets `PLEASE_WAIT`. In a
    /// preparing room a problem is generated, stored, and pushed to both
    /// members with `START_GAME`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a level outside `1..=10`, `StateConflict` if a
    /// problem is already in play (including losing a race with the
    /// opponent's request), `NotFound`/`Upstream` from the store.
    #[instrument(skip(self))]
    pub async fn request_problem(
        &self,
        connection_id: &str,
        level: i64,
    ) -> Result<ProblemOutcome, DuelError> {
        let room = self.room_of(connection_id).await?;

        let next = match room.status().problem_requested()? {
            ProblemGate::Wait => {
                debug!(room_id = %room.room_id(), "Room still waiting");
                self.gateway
                    .send(connection_id, &Notification::new(Tag::PleaseWait))
                    .await;
                return Ok(ProblemOutcome::PleaseWait);
            }
            ProblemGate::Generate { next } => next,
        };

        let length = usize::try_from(level)
            .map_err(|_| DuelError::invalid_parameter(format!("Invalid level {}", level)))?;
        let terms = problem::generate(length)?.into_terms();

        let applied = self
            .rooms
            .set_problem(room.room_id(), &terms, *room.status(), next)
            .await?;
        if !applied {
            warn!(room_id = %room.room_id(), "Room changed while generating problem");
            return Err(DuelError::state_conflict(
                "Room changed before the problem was stored",
            ));
        }

        let start = Notification::start_game(terms.clone());
        for member in room.members() {
            self.gateway.send(member, &start).await;
        }

        info!(room_id = %room.room_id(), ?terms, "Game started");
        Ok(ProblemOutcome::Started(terms))
    }

    /// Tears down the room of a disconnecting connection.
    ///
    /// The remaining member, if any, is force-disconnected; then both user
    /// records and the room are deleted.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user or room is already gone, `UserNotFound` if the
    /// user's room does not list it (its own record is still removed),
    /// `Upstream` on store failure.
    #[instrument(skip(self))]
    pub async fn leave(&self, connection_id: &str) -> Result<(), DuelError> {
        let room = self.room_of(connection_id).await?;

        if !room.is_member(connection_id) {
            warn!(room_id = %room.room_id(), "User record points at a foreign room");
            self.users.delete_user(connection_id).await?;
            return Err(DuelError::user_not_found(format!(
                "{} is not a member of room {}",
                connection_id,
                room.room_id()
            )));
        }

        if let Some(opponent) = room.opponent_of(connection_id) {
            info!(opponent = %opponent, "Closing opponent connection");
            self.gateway.disconnect(opponent).await;
        }

        for member in room.members() {
            self.users.delete_user(member).await?;
        }
        self.rooms.delete_room(room.room_id()).await?;

        info!(room_id = %room.room_id(), "Room torn down");
        Ok(())
    }
}
