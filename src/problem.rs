//! Arithmetic chain puzzles.
//!
//! A puzzle is a sequence of integers `t0, t1, ..., tn` that evaluates to
//! [`TARGET`] when each trailing term is either added to or subtracted from
//! the running total, left to right. Players answer with one sign per
//! trailing term.

use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::DuelError;

/// Value every puzzle evaluates to.
pub const TARGET: i64 = 2;

/// Longest puzzle that can be generated.
pub const MAX_LENGTH: usize = 10;

/// Exclusive upper bound for trailing terms.
const TERM_BOUND: i64 = 10;

/// Operator applied to a trailing term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// Add the term.
    Plus,
    /// Subtract the term.
    Minus,
}

impl Sign {
    /// Parses an answer token: `"p"` adds, anything else subtracts.
    pub fn from_token(token: &str) -> Self {
        if token == "p" { Sign::Plus } else { Sign::Minus }
    }

    /// Answer token for this sign.
    pub fn token(self) -> &'static str {
        match self {
            Sign::Plus => "p",
            Sign::Minus => "m",
        }
    }

    /// Returns the other sign.
    pub fn flipped(self) -> Self {
        match self {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
        }
    }

    /// Applies the sign to `term` on top of `acc`.
    pub fn apply(self, acc: i64, term: i64) -> i64 {
        match self {
            Sign::Plus => acc + term,
            Sign::Minus => acc - term,
        }
    }
}

/// A generated puzzle together with one known solution.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Puzzle {
    /// Terms sent to players.
    terms: Vec<i64>,
    /// One sign per trailing term that reaches [`TARGET`].
    solution: Vec<Sign>,
}

impl Puzzle {
    /// Consumes the puzzle, keeping only the terms.
    pub fn into_terms(self) -> Vec<i64> {
        self.terms
    }
}

/// Generates a puzzle of `length` terms using thread-local randomness.
///
/// # Errors
///
/// Returns [`DuelError`] with `InvalidParameter` unless `1 <= length <= 10`.
#[instrument]
pub fn generate(length: usize) -> Result<Puzzle, DuelError> {
    generate_with(&mut rand::rng(), length)
}

/// Generates a puzzle from the given random source.
///
/// The chain is built right to left: each trailing term is drawn from
/// `0..10` with a random sign and folded into a total that starts at
/// [`TARGET`]; the total becomes the leading term. Undoing every sign
/// therefore lands back on the target.
///
/// # Errors
///
/// Returns [`DuelError`] with `InvalidParameter` unless `1 <= length <= 10`.
pub fn generate_with<R: Rng>(rng: &mut R, length: usize) -> Result<Puzzle, DuelError> {
    if length == 0 || length > MAX_LENGTH {
        return Err(DuelError::invalid_parameter(format!(
            "Problem length must be between 1 and {}, got {}",
            MAX_LENGTH, length
        )));
    }

    let mut terms = vec![0; length];
    let mut solution = vec![Sign::Plus; length - 1];
    let mut sum = TARGET;

    for i in 0..length - 1 {
        let term = rng.random_range(0..TERM_BOUND);
        let sign = if rng.random_bool(0.5) { Sign::Plus } else { Sign::Minus };
        sum = sign.apply(sum, term);

        let position = length - 1 - i;
        terms[position] = term;
        solution[position - 1] = sign.flipped();
    }
    terms[0] = sum;

    debug!(length, ?terms, "Generated problem");
    Ok(Puzzle { terms, solution })
}
