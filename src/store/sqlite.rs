//! SQLite store backend.

use std::str::FromStr;

use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use super::{Room, RoomStore, StoreError, User, UserStore, schema};
use crate::RoomStatus;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::rooms)]
struct RoomRow {
    room_id: String,
    status: String,
    user1_id: String,
    user2_id: String,
    problem: String,
}

impl RoomRow {
    fn from_room(room: &Room) -> Result<Self, StoreError> {
        Ok(Self {
            room_id: room.room_id().clone(),
            status: room.status().to_string(),
            user1_id: room.user1_id().clone(),
            user2_id: room.user2_id().clone(),
            problem: serde_json::to_string(room.problem())?,
        })
    }

    fn into_room(self) -> Result<Room, StoreError> {
        let status = RoomStatus::from_str(&self.status)
            .map_err(|_| StoreError::new(format!("Invalid room status: '{}'", self.status)))?;
        let problem = serde_json::from_str(&self.problem)?;
        Ok(Room::new(self.room_id, status, self.user1_id, self.user2_id, problem))
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::users)]
struct UserRow {
    connection_id: String,
    room_id: String,
    solved: bool,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            connection_id: user.connection_id().clone(),
            room_id: user.room_id().clone(),
            solved: *user.solved(),
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::new(row.connection_id, row.room_id, row.solved)
    }
}

/// Room and user tables in a SQLite database file.
///
/// A connection is established per operation on the blocking pool. The
/// database runs in WAL mode, and each connection waits up to five seconds
/// for a competing writer before reporting `database is locked`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Opens the database at `db_path`, creating tables as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub async fn open(db_path: String) -> Result<Self, StoreError> {
        info!(path = %db_path, "Opening SQLite store");
        let store = Self { db_path };
        store
            .run(|conn| {
                conn.batch_execute("PRAGMA journal_mode = WAL;")?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StoreError::new(format!("Migrations failed: {}", e)))?;
                Ok(())
            })
            .await?;
        Ok(store)
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            debug!(path = %path, "Establishing connection");
            let mut conn = SqliteConnection::establish(&path)?;
            conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StoreError::new(format!("Store task failed: {}", e)))?
    }
}

#[async_trait]
impl RoomStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        let room_id = room_id.to_string();
        self.run(move |conn| {
            schema::rooms::table
                .find(room_id)
                .select(RoomRow::as_select())
                .first(conn)
                .optional()?
                .map(RoomRow::into_room)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self, room), fields(room_id = %room.room_id()))]
    async fn put_room(&self, room: Room) -> Result<(), StoreError> {
        let row = RoomRow::from_room(&room)?;
        self.run(move |conn| {
            diesel::replace_into(schema::rooms::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn attach_challenger(
        &self,
        room_id: &str,
        challenger: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, StoreError> {
        use schema::rooms::dsl;

        let room_id = room_id.to_string();
        let challenger = challenger.to_string();
        self.run(move |conn| {
            let updated = diesel::update(
                dsl::rooms
                    .filter(dsl::room_id.eq(room_id))
                    .filter(dsl::status.eq(from.to_string()))
                    .filter(dsl::user2_id.eq("")),
            )
            .set((dsl::user2_id.eq(challenger), dsl::status.eq(to.to_string())))
            .execute(conn)?;
            Ok(updated == 1)
        })
        .await
    }

    #[instrument(skip(self, problem))]
    async fn set_problem(
        &self,
        room_id: &str,
        problem: &[i64],
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, StoreError> {
        use schema::rooms::dsl;

        let room_id = room_id.to_string();
        let encoded = serde_json::to_string(problem)?;
        self.run(move |conn| {
            let updated = diesel::update(
                dsl::rooms
                    .filter(dsl::room_id.eq(room_id))
                    .filter(dsl::status.eq(from.to_string())),
            )
            .set((dsl::problem.eq(encoded), dsl::status.eq(to.to_string())))
            .execute(conn)?;
            Ok(updated == 1)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: &str) -> Result<(), StoreError> {
        let room_id = room_id.to_string();
        self.run(move |conn| {
            diesel::delete(schema::rooms::table.find(room_id)).execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get_user(&self, connection_id: &str) -> Result<Option<User>, StoreError> {
        let connection_id = connection_id.to_string();
        self.run(move |conn| {
            let row = schema::users::table
                .find(connection_id)
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(User::from))
        })
        .await
    }

    #[instrument(skip(self, user), fields(connection_id = %user.connection_id()))]
    async fn put_user(&self, user: User) -> Result<(), StoreError> {
        let row = UserRow::from(&user);
        self.run(move |conn| {
            diesel::replace_into(schema::users::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn mark_solved(&self, connection_id: &str) -> Result<(), StoreError> {
        use schema::users::dsl;

        let connection_id = connection_id.to_string();
        self.run(move |conn| {
            diesel::update(dsl::users.find(connection_id))
                .set(dsl::solved.eq(true))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, connection_id: &str) -> Result<(), StoreError> {
        let connection_id = connection_id.to_string();
        self.run(move |conn| {
            diesel::delete(schema::users::table.find(connection_id)).execute(conn)?;
            Ok(())
        })
        .await
    }
}
