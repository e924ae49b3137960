//! Attempt scoring.
//!
//! Everything in here is pure: callers load the quiz and attempt, hand them
//! in, and persist whatever comes back.

pub mod aggregate;
pub mod evaluator;
pub mod review;

use std::fmt;

use uuid::Uuid;

pub use aggregate::{grade_attempt, record_answer, time_limit_exceeded};
pub use evaluator::{Evaluation, evaluate};
pub use review::{AttemptReview, review_attempt};

#[derive(Debug, Clone, PartialEq)]
pub enum GradingError {
    /// The attempt already left the in-progress state.
    AlreadySubmitted,
    /// An answer references a question the quiz does not contain.
    UnknownQuestion(Uuid),
    /// The quiz time limit elapsed before the answer was saved.
    TimeLimitExceeded,
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::AlreadySubmitted => write!(f, "Attempt has already been submitted"),
            GradingError::UnknownQuestion(id) => {
                write!(f, "Question {} is not part of this quiz", id)
            }
            GradingError::TimeLimitExceeded => write!(f, "Time limit for this quiz has expired"),
        }
    }
}

impl std::error::Error for GradingError {}
