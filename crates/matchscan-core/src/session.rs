//! Assessment session state.
//!
//! An [`AssessmentSession`] is the mutable state of one evaluation run. The
//! allocation controller grows its queue; the host records answers against
//! it. Sessions are plain values: save them with [`AssessmentSession::snapshot`]
//! and bring them back with [`AssessmentSession::resume`], which rebuilds the
//! used/skipped sets from the persisted queue instead of re-allocating.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bank::QuestionBank;
use crate::error::SessionError;
use crate::model::{Origin, QuestionItem, QuestionKey, Rating};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub key: QuestionKey,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Progress through a session, for progress displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub answered_count: usize,
    pub target_size: usize,
    /// `answered_count / target_size * 100`, rounded half up.
    pub percent: u8,
}

/// Lifecycle of a single queue position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Answered,
    Skipped,
}

/// The mutable state of one evaluation run.
#[derive(Debug, Clone)]
pub struct AssessmentSession {
    target_size: usize,
    queue: Vec<QuestionItem>,
    used_keys: HashSet<QuestionKey>,
    skipped: Vec<QuestionKey>,
    skipped_keys: HashSet<QuestionKey>,
    answers: Vec<Answer>,
    answered_keys: HashSet<QuestionKey>,
    cursor: usize,
    unresolved_skips: usize,
    finished_early: bool,
}

impl AssessmentSession {
    pub(crate) fn new(target_size: usize) -> Self {
        Self {
            target_size,
            queue: Vec::with_capacity(target_size),
            used_keys: HashSet::with_capacity(target_size),
            skipped: Vec::new(),
            skipped_keys: HashSet::new(),
            answers: Vec::new(),
            answered_keys: HashSet::new(),
            cursor: 0,
            unresolved_skips: 0,
            finished_early: false,
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn queue(&self) -> &[QuestionItem] {
        &self.queue
    }

    /// Every key ever placed in the queue.
    pub fn used_keys(&self) -> &HashSet<QuestionKey> {
        &self.used_keys
    }

    pub fn skipped_keys(&self) -> &HashSet<QuestionKey> {
        &self.skipped_keys
    }

    /// Answers in the order they were given.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Index of the next item to present.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Skips for which the bank had no replacement left.
    pub fn unresolved_skips(&self) -> usize {
        self.unresolved_skips
    }

    pub fn is_used(&self, key: &QuestionKey) -> bool {
        self.used_keys.contains(key)
    }

    pub fn state_of(&self, key: &QuestionKey) -> Option<ItemState> {
        if !self.used_keys.contains(key) {
            None
        } else if self.skipped_keys.contains(key) {
            Some(ItemState::Skipped)
        } else if self.answered_keys.contains(key) {
            Some(ItemState::Answered)
        } else {
            Some(ItemState::Pending)
        }
    }

    /// The item at the cursor, if any remain.
    pub fn current(&self) -> Option<&QuestionItem> {
        self.queue.get(self.cursor)
    }

    /// Every queue position is answered or skipped.
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    /// Complete, or ended by the host before completion.
    pub fn is_finished(&self) -> bool {
        self.finished_early || self.is_complete()
    }

    /// End the session without answering the remaining items.
    pub fn finish_early(&mut self) {
        if !self.is_complete() {
            tracing::info!(
                answered = self.answers.len(),
                target_size = self.target_size,
                "session finished early"
            );
        }
        self.finished_early = true;
    }

    pub fn system_selected_count(&self) -> usize {
        self.queue
            .iter()
            .filter(|item| item.origin == Origin::SystemSelected)
            .count()
    }

    /// Record a rating for a pending question and move the cursor on.
    pub fn record_answer(
        &mut self,
        key: &QuestionKey,
        rating: Rating,
        note: Option<String>,
    ) -> Result<(), SessionError> {
        match self.state_of(key) {
            None => return Err(SessionError::NotInQueue(key.clone())),
            Some(ItemState::Skipped) => return Err(SessionError::AlreadySkipped(key.clone())),
            Some(ItemState::Answered) => return Err(SessionError::AlreadyAnswered(key.clone())),
            Some(ItemState::Pending) => {}
        }

        let note = note.filter(|n| !n.trim().is_empty());
        self.answered_keys.insert(key.clone());
        self.answers.push(Answer {
            key: key.clone(),
            rating,
            note,
        });
        self.advance_cursor();
        Ok(())
    }

    pub fn progress(&self) -> Progress {
        let percent = if self.target_size == 0 {
            0
        } else {
            let scaled = (self.answers.len() * 200 + self.target_size) / (self.target_size * 2);
            scaled.min(100) as u8
        };
        Progress {
            answered_count: self.answers.len(),
            target_size: self.target_size,
            percent,
        }
    }

    pub(crate) fn enqueue(&mut self, item: QuestionItem) {
        debug_assert!(!self.used_keys.contains(&item.key));
        self.used_keys.insert(item.key.clone());
        self.queue.push(item);
        self.advance_cursor();
    }

    pub(crate) fn mark_skipped(&mut self, key: &QuestionKey) {
        if self.skipped_keys.insert(key.clone()) {
            self.skipped.push(key.clone());
        }
        self.advance_cursor();
    }

    pub(crate) fn note_unresolved_skip(&mut self) {
        self.unresolved_skips += 1;
    }

    fn advance_cursor(&mut self) {
        while let Some(item) = self.queue.get(self.cursor) {
            if self.skipped_keys.contains(&item.key) || self.answered_keys.contains(&item.key) {
                self.cursor += 1;
            } else {
                break;
            }
        }
    }

    /// Verify the structural invariants of the session.
    pub fn check_invariants(&self) -> Result<(), SessionError> {
        let violation = |msg: String| Err(SessionError::InvariantViolation(msg));

        let mut seen = HashSet::with_capacity(self.queue.len());
        for item in &self.queue {
            if !seen.insert(&item.key) {
                return violation(format!("queue contains {} twice", item.key));
            }
        }
        if seen.len() != self.used_keys.len() || !self.used_keys.iter().all(|k| seen.contains(k)) {
            return violation("used keys differ from the keys in the queue".into());
        }

        if let Some(key) = self
            .skipped_keys
            .iter()
            .find(|k| !self.used_keys.contains(*k))
        {
            return violation(format!("skipped key {key} was never queued"));
        }
        if self.skipped.len() != self.skipped_keys.len() {
            return violation("skip list contains duplicates".into());
        }

        let mut answered = HashSet::with_capacity(self.answers.len());
        for answer in &self.answers {
            if self.skipped_keys.contains(&answer.key) {
                return violation(format!("skipped key {} has an answer", answer.key));
            }
            if !self.used_keys.contains(&answer.key) {
                return violation(format!("answer for {} which was never queued", answer.key));
            }
            if !answered.insert(&answer.key) {
                return violation(format!("{} answered twice", answer.key));
            }
        }

        if self.unresolved_skips > self.skipped.len()
            || self.queue.len() + self.unresolved_skips != self.target_size + self.skipped.len()
        {
            return violation(format!(
                "queue of {} with {} skip(s), {} unresolved does not back-fill target {}",
                self.queue.len(),
                self.skipped.len(),
                self.unresolved_skips,
                self.target_size
            ));
        }

        let threshold = self.target_size.div_ceil(2);
        let system = self.system_selected_count();
        let user = self.queue.len() - system;
        if user < threshold && system < threshold {
            return violation(format!(
                "only {system} system-selected item(s), guardrail requires {threshold}"
            ));
        }

        if self.cursor > self.queue.len()
            || self.queue[..self.cursor]
                .iter()
                .any(|item| self.state_of(&item.key) == Some(ItemState::Pending))
        {
            return violation(format!("cursor {} passes a pending item", self.cursor));
        }

        Ok(())
    }

    /// Capture the persisted form of this session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            target_size: self.target_size,
            queue: self.queue.clone(),
            skipped: self.skipped.clone(),
            answers: self.answers.clone(),
            cursor: self.cursor,
            finished_early: self.finished_early,
        }
    }

    /// Rebuild a session from a snapshot.
    ///
    /// Used and skipped sets come strictly from the persisted queue and skip
    /// list; nothing is re-allocated. Every queued key must still exist in
    /// `bank` with the same text.
    pub fn resume(snapshot: SessionSnapshot, bank: &QuestionBank) -> Result<Self, SessionError> {
        let corrupt = |msg: String| SessionError::CorruptSnapshot(msg);

        if snapshot.target_size == 0 {
            return Err(corrupt("target size is zero".into()));
        }

        let mut session = AssessmentSession::new(snapshot.target_size);
        for item in snapshot.queue {
            let Some(text) = bank.question(&item.key) else {
                return Err(corrupt(format!("{} is not in bank {}", item.key, bank.id())));
            };
            if text != item.text {
                return Err(corrupt(format!(
                    "{} text differs from bank {} version {}",
                    item.key,
                    bank.id(),
                    bank.version()
                )));
            }
            if session.used_keys.contains(&item.key) {
                return Err(corrupt(format!("queue contains {} twice", item.key)));
            }
            session.used_keys.insert(item.key.clone());
            session.queue.push(item);
        }

        for key in snapshot.skipped {
            if !session.used_keys.contains(&key) {
                return Err(corrupt(format!("skipped key {key} is not in the queue")));
            }
            if !session.skipped_keys.insert(key.clone()) {
                return Err(corrupt(format!("{key} skipped twice")));
            }
            session.skipped.push(key);
        }

        for answer in snapshot.answers {
            match session.state_of(&answer.key) {
                None => return Err(corrupt(format!("answer for unqueued key {}", answer.key))),
                Some(ItemState::Skipped) => {
                    return Err(corrupt(format!("answer for skipped key {}", answer.key)))
                }
                Some(ItemState::Answered) => {
                    return Err(corrupt(format!("{} answered twice", answer.key)))
                }
                Some(ItemState::Pending) => {}
            }
            session.answered_keys.insert(answer.key.clone());
            session.answers.push(answer);
        }

        session.unresolved_skips = (session.target_size + session.skipped.len())
            .checked_sub(session.queue.len())
            .ok_or_else(|| {
                corrupt(format!(
                    "queue of {} is longer than target {} plus {} skip(s)",
                    session.queue.len(),
                    session.target_size,
                    session.skipped.len()
                ))
            })?;

        session.advance_cursor();
        if session.cursor != snapshot.cursor {
            tracing::debug!(
                persisted = snapshot.cursor,
                rebuilt = session.cursor,
                "cursor rebuilt from queue state"
            );
        }
        session.finished_early = snapshot.finished_early;

        session
            .check_invariants()
            .map_err(|e| corrupt(e.to_string()))?;

        tracing::info!(
            queued = session.queue.len(),
            answered = session.answers.len(),
            skipped = session.skipped.len(),
            "session resumed"
        );
        Ok(session)
    }
}

/// Persisted form of an [`AssessmentSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub target_size: usize,
    pub queue: Vec<QuestionItem>,
    /// Skipped keys in skip order.
    #[serde(default)]
    pub skipped: Vec<QuestionKey>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    /// Informational; resume recomputes it from the queue.
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub finished_early: bool,
}
