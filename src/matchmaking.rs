//! Pairing of arriving connections through the rendezvous queue.
//!
//! A waiting room is advertised by a single token on the queue. An arriving
//! connection takes a lease on the oldest visible token and completes that
//! room; with no token available it creates a room and advertises it. The
//! queue's visibility lease is the only ordering primitive: a token held by
//! one matcher is hidden from the others until it is deleted or the lease
//! runs out.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    DuelError, MatchmakingConfig, RendezvousQueue, Room, RoomId, RoomStatus, RoomStore, User,
    UserStore,
};

/// Places connections into rooms.
#[derive(Debug, Clone)]
pub struct Matchmaker {
    rooms: Arc<dyn RoomStore>,
    users: Arc<dyn UserStore>,
    queue: Arc<dyn RendezvousQueue>,
    config: MatchmakingConfig,
}

impl Matchmaker {
    /// Creates a matchmaker over the given handles.
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        users: Arc<dyn UserStore>,
        queue: Arc<dyn RendezvousQueue>,
        config: MatchmakingConfig,
    ) -> Self {
        Self {
            rooms,
            users,
            queue,
            config,
        }
    }

    /// Places `connection_id` into a room and returns the room id.
    ///
    /// Completes the room advertised by the next visible token, or creates
    /// and advertises a new waiting room. A token whose room is gone or
    /// already has a challenger is stale: it is deleted and the next one is
    /// tried, up to the configured number of receives.
    ///
    /// # Errors
    ///
    /// `Upstream` if a store or queue call fails. Creating a room and then
    /// failing to publish its token leaves an unadvertised waiting room.
    #[instrument(skip(self))]
    pub async fn join(&self, connection_id: &str) -> Result<RoomId, DuelError> {
        let next = RoomStatus::Waiting.challenger_joined()?;

        // Always receive at least once.
        let attempts = (*self.config.max_receive_attempts()).max(1);
        for attempt in 1..=attempts {
            let Some(token) = self
                .queue
                .receive(self.config.visibility_timeout())
                .await?
            else {
                debug!(attempt, "No waiting room advertised");
                break;
            };

            let room_id = token.body().clone();
            let completed = self
                .rooms
                .attach_challenger(&room_id, connection_id, RoomStatus::Waiting, next)
                .await?;
            self.queue.delete(token.receipt()).await?;

            if completed {
                self.register(connection_id, &room_id).await?;
                info!(room_id = %room_id, "Match complete");
                return Ok(room_id);
            }
            warn!(room_id = %room_id, attempt, "Discarded stale rendezvous token");
        }

        self.create_room(connection_id).await
    }

    async fn create_room(&self, connection_id: &str) -> Result<RoomId, DuelError> {
        let room_id = Uuid::new_v4().to_string();
        self.rooms
            .put_room(Room::waiting(room_id.clone(), connection_id.to_string()))
            .await?;

        self.queue
            .publish(&room_id, self.config.publish_delay())
            .await?;

        self.register(connection_id, &room_id).await?;
        info!(room_id = %room_id, "Room created, waiting for a challenger");
        Ok(room_id)
    }

    async fn register(&self, connection_id: &str, room_id: &str) -> Result<(), DuelError> {
        self.users
            .put_user(User::joined(connection_id.to_string(), room_id.to_string()))
            .await?;
        Ok(())
    }
}
