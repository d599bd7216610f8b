//! Boundary dispatcher for connection lifecycle events.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    Adjudicator, ClientMessage, DuelError, DuelErrorKind, Gateway, MatchmakingConfig, Matchmaker,
    RendezvousQueue, RoomId, RoomLifecycle, RoomStore, UserStore,
};

/// Handles injected into every component.
#[derive(Debug, Clone)]
pub struct Backends {
    /// Room records.
    pub rooms: Arc<dyn RoomStore>,
    /// User records.
    pub users: Arc<dyn UserStore>,
    /// Rendezvous queue.
    pub queue: Arc<dyn RendezvousQueue>,
    /// Outbound transport.
    pub gateway: Arc<dyn Gateway>,
}

/// Result of routing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// A problem request was handled.
    Problem(crate::ProblemOutcome),
    /// An answer was judged.
    Answer(crate::Verdict),
}

/// Stateless entry point for connect, message and disconnect events.
///
/// Every call re-reads what it needs from the store; concurrent calls share
/// nothing but the injected handles.
#[derive(Debug, Clone)]
pub struct DuelService {
    matchmaker: Matchmaker,
    lifecycle: RoomLifecycle,
    adjudicator: Adjudicator,
}

impl DuelService {
    /// Wires the components over `backends`.
    #[instrument(skip(backends))]
    pub fn new(backends: Backends, matchmaking: MatchmakingConfig) -> Self {
        info!("Creating duel service");
        let Backends {
            rooms,
            users,
            queue,
            gateway,
        } = backends;

        Self {
            matchmaker: Matchmaker::new(
                Arc::clone(&rooms),
                Arc::clone(&users),
                queue,
                matchmaking,
            ),
            lifecycle: RoomLifecycle::new(
                Arc::clone(&rooms),
                Arc::clone(&users),
                Arc::clone(&gateway),
            ),
            adjudicator: Adjudicator::new(rooms, users, gateway),
        }
    }

    /// A new connection arrived.
    ///
    /// # Errors
    ///
    /// See [`Matchmaker::join`].
    #[instrument(skip(self))]
    pub async fn on_connect(&self, connection_id: &str) -> Result<RoomId, DuelError> {
        self.matchmaker.join(connection_id).await
    }

    /// A text frame arrived from a connection.
    ///
    /// # Errors
    ///
    /// `MalformedMessage` for unknown bodies; otherwise see
    /// [`RoomLifecycle::request_problem`] and [`Adjudicator::submit`].
    #[instrument(skip(self, body))]
    pub async fn on_message(
        &self,
        connection_id: &str,
        body: &str,
    ) -> Result<MessageOutcome, DuelError> {
        match ClientMessage::parse(body)? {
            ClientMessage::ProblemRequest { level } => self
                .lifecycle
                .request_problem(connection_id, level)
                .await
                .map(MessageOutcome::Problem),
            ClientMessage::Answer { answer, problem } => {
                if let Some(problem) = problem {
                    debug!(?problem, "Client echoed a problem; judging the stored one");
                }
                self.adjudicator
                    .submit(connection_id, &answer)
                    .await
                    .map(MessageOutcome::Answer)
            }
        }
    }

    /// A connection went away.
    ///
    /// A connection whose room was already torn down (typically the member
    /// closed by the opponent's teardown) is not an error.
    ///
    /// # Errors
    ///
    /// See [`RoomLifecycle::leave`].
    #[instrument(skip(self))]
    pub async fn on_disconnect(&self, connection_id: &str) -> Result<(), DuelError> {
        match self.lifecycle.leave(connection_id).await {
            Err(e) if e.kind() == DuelErrorKind::NotFound => {
                debug!(error = %e, "Nothing to tear down");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Teardown failed");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }
}
