//! Answer checking and win/lose resolution between the two solvers.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::problem::{Sign, TARGET};
use crate::{DuelError, Gateway, Notification, RoomLifecycle, RoomStore, Tag, UserStore};

/// Checks an answer against a problem.
///
/// `answers` holds one token per trailing term: `"p"` adds the term, anything
/// else subtracts it. Fails closed when the lengths do not line up.
pub fn check<S: AsRef<str>>(problem: &[i64], answers: &[S]) -> bool {
    if problem.len() != answers.len() + 1 {
        return false;
    }

    let total = problem[1..]
        .iter()
        .zip(answers)
        .fold(problem[0], |acc, (term, token)| {
            Sign::from_token(token.as_ref()).apply(acc, *term)
        });
    total == TARGET
}

/// Outcome of one submission, from the submitter's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The answer does not reach the target.
    WrongAnswer,
    /// Correct, but the opponent already solved.
    TooLate,
    /// Correct and first.
    Win,
    /// The submitter already won this room; nothing is sent.
    AlreadySolved,
}

impl Verdict {
    /// Decides the verdict from correctness and the opponent's solve status.
    pub fn judge(correct: bool, opponent_solved: bool) -> Self {
        if !correct {
            Verdict::WrongAnswer
        } else if opponent_solved {
            Verdict::TooLate
        } else {
            Verdict::Win
        }
    }

    /// Tag pushed to the submitter.
    pub fn tag(self) -> Tag {
        match self {
            Verdict::WrongAnswer => Tag::WrongAnswer,
            Verdict::TooLate => Tag::YouLose,
            Verdict::Win | Verdict::AlreadySolved => Tag::YouWin,
        }
    }
}

/// Adjudicates answer submissions for rooms in play.
#[derive(Debug, Clone)]
pub struct Adjudicator {
    lifecycle: RoomLifecycle,
    users: Arc<dyn UserStore>,
    gateway: Arc<dyn Gateway>,
}

impl Adjudicator {
    /// Creates an adjudicator over the given handles.
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        users: Arc<dyn UserStore>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        Self {
            lifecycle: RoomLifecycle::new(rooms, Arc::clone(&users), Arc::clone(&gateway)),
            users,
            gateway,
        }
    }

    /// Judges a submission from `connection_id` and notifies the players.
    ///
    /// A wrong answer is reported to the submitter only. A correct answer
    /// after the opponent solved gets `YOU_LOSE`. Otherwise the submitter is
    /// marked solved, gets `YOU_WIN`, and the opponent gets `YOU_LOSE`.
    /// Once a submitter has won, further submissions are answered with
    /// [`Verdict::AlreadySolved`] and notify nobody.
    ///
    /// # Errors
    ///
    /// `StateConflict` unless the room is playing, `UserNotFound` (after
    /// force-disconnecting the submitter) if the submitter is not a member of
    /// its room, `NotFound`/`Upstream` from the store.
    #[instrument(skip(self, answers), fields(answer_len = answers.len()))]
    pub async fn submit<S: AsRef<str> + Sync>(
        &self,
        connection_id: &str,
        answers: &[S],
    ) -> Result<Verdict, DuelError> {
        let (submitter, room) = self.lifecycle.member_of(connection_id).await?;
        room.status().accepts_answers()?;

        if *submitter.solved() {
            debug!(room_id = %room.room_id(), "Submitter already won");
            return Ok(Verdict::AlreadySolved);
        }

        let correct = check(room.problem(), answers);
        debug!(room_id = %room.room_id(), correct, "Answer checked");

        let Some(opponent) = room.opponent_of(connection_id) else {
            warn!(room_id = %room.room_id(), "Submitter is not a member of its room");
            self.gateway.disconnect(connection_id).await;
            return Err(DuelError::user_not_found(format!(
                "{} is not a member of room {}",
                connection_id,
                room.room_id()
            )));
        };

        let opponent_solved = match self.users.get_user(opponent).await? {
            Some(user) => *user.solved(),
            None => {
                return Err(DuelError::not_found(format!(
                    "Opponent {} does not exist",
                    opponent
                )));
            }
        };

        let verdict = Verdict::judge(correct, opponent_solved);
        if verdict == Verdict::Win {
            self.users.mark_solved(connection_id).await?;
        }

        self.gateway
            .send(connection_id, &Notification::new(verdict.tag()))
            .await;
        if verdict == Verdict::Win {
            self.gateway
                .send(opponent, &Notification::new(Tag::YouLose))
                .await;
        }

        info!(room_id = %room.room_id(), ?verdict, "Submission judged");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_follows_signs_in_order() {
        assert!(check(&[10, 3, 5], &["m", "m"]));
        assert!(!check(&[10, 3, 5], &["p", "m"]));
        assert!(check(&[0, 5, 3], &["p", "m"]));
        assert!(check(&[2], &[] as &[&str]));
    }

    #[test]
    fn check_fails_closed_on_length_mismatch() {
        assert!(!check(&[10, 3, 5], &["m"]));
        assert!(!check(&[10, 3, 5], &["m", "m", "m"]));
        assert!(!check(&[], &[] as &[&str]));
    }

    #[test]
    fn unknown_tokens_subtract() {
        assert!(check(&[10, 3, 5], &["minus", "x"]));
    }

    #[test]
    fn verdict_table() {
        assert_eq!(Verdict::judge(false, false), Verdict::WrongAnswer);
        assert_eq!(Verdict::judge(false, true), Verdict::WrongAnswer);
        assert_eq!(Verdict::judge(true, true), Verdict::TooLate);
        assert_eq!(Verdict::judge(true, false), Verdict::Win);
        assert_eq!(Verdict::TooLate.tag(), Tag::YouLose);
    }
}
