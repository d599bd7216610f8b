//! Keyed persistence for rooms and users.
//!
//! Records are fetched by key on every operation. Writes are last-writer-wins
//! except for the compare-and-set transitions on rooms, which only apply when
//! the stored status still matches the expected one.

mod error;
mod memory;
mod models;
mod schema;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{ConnectionId, Room, RoomId, User};
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::RoomStatus;

/// Room records keyed by room id.
#[async_trait]
pub trait RoomStore: Send + Sync + std::fmt::Debug {
    /// Fetches a room, `None` if absent.
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError>;

    /// Inserts or replaces a room.
    async fn put_room(&self, room: Room) -> Result<(), StoreError>;

    /// Sets the challenger and moves the room from `from` to `to`.
    ///
    /// Applies only if the room exists, its status is `from` and it has no
    /// challenger yet. Returns whether the update was applied.
    async fn attach_challenger(
        &self,
        room_id: &str,
        challenger: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, StoreError>;

    /// Stores the active problem and moves the room from `from` to `to`.
    ///
    /// Applies only if the room exists with status `from`. Returns whether
    /// the update was applied.
    async fn set_problem(
        &self,
        room_id: &str,
        problem: &[i64],
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, StoreError>;

    /// Deletes a room. Deleting an absent room is not an error.
    async fn delete_room(&self, room_id: &str) -> Result<(), StoreError>;
}

/// User records keyed by connection id.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// Fetches a user, `None` if absent.
    async fn get_user(&self, connection_id: &str) -> Result<Option<User>, StoreError>;

    /// Inserts or replaces a user.
    async fn put_user(&self, user: User) -> Result<(), StoreError>;

    /// Sets `solved` on an existing user. Missing users are left absent.
    async fn mark_solved(&self, connection_id: &str) -> Result<(), StoreError>;

    /// Deletes a user. Deleting an absent user is not an error.
    async fn delete_user(&self, connection_id: &str) -> Result<(), StoreError>;
}
