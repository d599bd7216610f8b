//! Two Duel library - head-to-head arithmetic puzzle matchmaking
//!
//! Two players are paired through a rendezvous queue, receive the same sign
//! puzzle, and race to find signs that make it evaluate to the target.
//!
//! # Architecture
//!
//! - **Matchmaking**: pairs arriving connections through a queue token per waiting room
//! - **Room lifecycle**: `WAITING` → `PREPARING` → `PLAYING`, problem delivery, teardown
//! - **Adjudicator**: answer checking and first-correct-wins resolution
//! - **Store / Queue / Gateway**: injected backends (in-memory, SQLite, WebSocket)
//! - **Server**: axum WebSocket endpoint plus a one-shot problem endpoint
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use two_duel::{Backends, DuelService, MatchmakingConfig, MemoryQueue, MemoryStore, RecordingGateway};
//!
//! # async fn example() -> Result<(), two_duel::DuelError> {
//! let store = Arc::new(MemoryStore::new());
//! let service = DuelService::new(
//!     Backends {
//!         rooms: store.clone(),
//!         users: store,
//!         queue: Arc::new(MemoryQueue::new()),
//!         gateway: Arc::new(RecordingGateway::new()),
//!     },
//!     MatchmakingConfig::default(),
//! );
//!
//! let room = service.on_connect("alice").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod adjudicator;
mod config;
mod error;
mod gateway;
mod matchmaking;
mod protocol;
mod queue;
mod room;
mod server;
mod service;
mod store;

/// Sign puzzle generation.
pub mod problem;

// Crate-level exports - Errors
pub use error::{DuelError, DuelErrorKind};

// Crate-level exports - Configuration
pub use config::{ConfigError, MEMORY_STORE, MatchmakingConfig, PORT_ENV, STORE_ENV, ServerConfig};

// Crate-level exports - Storage
pub use store::{
    ConnectionId, MemoryStore, Room, RoomId, RoomStore, SqliteStore, StoreError, User, UserStore,
};

// Crate-level exports - Rendezvous queue
pub use queue::{MemoryQueue, QueueError, RendezvousQueue, Token};

// Crate-level exports - Outbound transport
pub use gateway::{ChannelGateway, Gateway, GatewayEvent, Outbound, RecordingGateway};

// Crate-level exports - Wire protocol
pub use protocol::{ClientMessage, ErrorReply, Notification, Tag};

// Crate-level exports - Game flow
pub use adjudicator::{Adjudicator, Verdict, check};
pub use matchmaking::Matchmaker;
pub use room::{ProblemGate, ProblemOutcome, RoomLifecycle, RoomStatus};
pub use service::{Backends, DuelService, MessageOutcome};

// Crate-level exports - Server
pub use server::{AppState, ProblemQuery, router, serve, serve_listener};
