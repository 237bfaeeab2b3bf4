//! Engine error types.
//!
//! Allocation, scoring and session failures are typed so hosts can tell a
//! caller mistake (bad target size, bad selection) apart from a host bug
//! (skipping a key twice) without string matching. Running out of
//! replacement questions is not an error; see
//! [`Replacement::Unavailable`](crate::allocation::Replacement::Unavailable).

use thiserror::Error;

use crate::model::{CategoryId, QuestionKey};

/// Errors raised while building or extending a session queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The target size is zero or smaller than the explicit selection.
    #[error("target size {target_size} is invalid for {selected} explicitly selected question(s)")]
    InvalidTargetSize { target_size: usize, selected: usize },

    /// The whole bank ran dry before the initial queue was filled.
    #[error("question bank exhausted: needed {needed} questions, only {available} available")]
    InsufficientQuestions { needed: usize, available: usize },

    /// Skip requested for a key that is not live in the queue.
    #[error("invalid skip target {key}: {reason}")]
    InvalidSkipTarget { key: QuestionKey, reason: String },

    /// The selection names a category the bank does not have.
    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),

    /// The selection names a question index outside its category.
    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionKey),

    /// The same question was explicitly selected twice.
    #[error("question selected more than once: {0}")]
    DuplicateSelection(QuestionKey),
}

/// Errors raised by scoring and classification.
///
/// All of these are programmer errors: the engine never substitutes a
/// default score.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("cannot score an empty answer set")]
    EmptyAnswerSet,

    #[error("unknown rating: {0}")]
    UnknownRating(String),

    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(u32),

    #[error("invalid rating scale: {0}")]
    InvalidScale(String),

    #[error("invalid band table: {0}")]
    InvalidBands(String),
}

/// Errors raised while recording answers or restoring a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("question {0} is not in the session queue")]
    NotInQueue(QuestionKey),

    #[error("question {0} was skipped and cannot be answered")]
    AlreadySkipped(QuestionKey),

    #[error("question {0} has already been answered")]
    AlreadyAnswered(QuestionKey),

    #[error("corrupt session snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("session invariant violated: {0}")]
    InvariantViolation(String),
}

impl AllocationError {
    /// Returns `true` if the caller can recover by changing its input
    /// (smaller target, different selection) rather than fixing a bug.
    pub fn is_caller_input(&self) -> bool {
        !matches!(self, AllocationError::InvalidSkipTarget { .. })
    }
}
