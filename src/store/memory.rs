//! In-process store backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{ConnectionId, Room, RoomId, RoomStore, StoreError, User, UserStore};
use crate::RoomStatus;

/// Room and user tables held in memory.
///
/// Each operation takes the table lock for the duration of that single
/// operation only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<RoomId, Room>>,
    users: Mutex<HashMap<ConnectionId, User>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.lock().await.get(room_id).cloned())
    }

    #[instrument(skip(self, room), fields(room_id = %room.room_id()))]
    async fn put_room(&self, room: Room) -> Result<(), StoreError> {
        self.rooms.lock().await.insert(room.room_id().clone(), room);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn attach_challenger(
        &self,
        room_id: &str,
        challenger: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(room_id) {
            Some(room) if *room.status() == from && !room.has_challenger() => {
                room.attach(challenger.to_string(), to);
                Ok(true)
            }
            Some(room) => {
                debug!(status = %room.status(), user2_id = %room.user2_id(), "Challenger guard failed");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self, problem))]
    async fn set_problem(
        &self,
        room_id: &str,
        problem: &[i64],
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(room_id) {
            Some(room) if *room.status() == from => {
                room.install_problem(problem.to_vec(), to);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: &str) -> Result<(), StoreError> {
        self.rooms.lock().await.remove(room_id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get_user(&self, connection_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.get(connection_id).cloned())
    }

    #[instrument(skip(self, user), fields(connection_id = %user.connection_id()))]
    async fn put_user(&self, user: User) -> Result<(), StoreError> {
        self.users
            .lock()
            .await
            .insert(user.connection_id().clone(), user);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_solved(&self, connection_id: &str) -> Result<(), StoreError> {
        if let Some(user) = self.users.lock().await.get_mut(connection_id) {
            user.mark_solved();
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, connection_id: &str) -> Result<(), StoreError> {
        self.users.lock().await.remove(connection_id);
        Ok(())
    }
}
