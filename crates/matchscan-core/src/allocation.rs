//! Question allocation controller.
//!
//! Builds the initial queue for a session from a caller selection and
//! back-fills skipped questions one for one. Draws are deterministic in the
//! bank's draw order; use [`QuestionBank::shuffled`] for a random mode that
//! stays reproducible for a given seed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bank::{BankCategory, QuestionBank};
use crate::error::AllocationError;
use crate::model::{CategoryId, Origin, QuestionItem, QuestionKey};
use crate::session::{AssessmentSession, ItemState, Progress};

/// What the caller chose from one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Choice {
    /// Explicit question indices, enqueued first in the order given.
    Questions(Vec<usize>),
    /// Draw from the category without pinning particular questions.
    WholeCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub category: CategoryId,
    pub choice: Choice,
}

/// The caller's part of the queue: explicit questions and categories to
/// draw from. An empty selection draws from the whole bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub entries: Vec<CategorySelection>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn questions(mut self, category: impl Into<CategoryId>, indices: Vec<usize>) -> Self {
        self.entries.push(CategorySelection {
            category: category.into(),
            choice: Choice::Questions(indices),
        });
        self
    }

    pub fn whole_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.entries.push(CategorySelection {
            category: category.into(),
            choice: Choice::WholeCategory,
        });
        self
    }

    /// Explicit keys in the order supplied. Consecutive keys from one
    /// category share an entry.
    pub fn from_keys(keys: impl IntoIterator<Item = QuestionKey>) -> Self {
        let mut selection = Self::new();
        for key in keys {
            let previous = selection
                .entries
                .last_mut()
                .filter(|entry| entry.category == key.category)
                .and_then(|entry| match &mut entry.choice {
                    Choice::Questions(indices) => Some(indices),
                    Choice::WholeCategory => None,
                });
            match previous {
                Some(indices) => indices.push(key.index),
                None => selection.entries.push(CategorySelection {
                    category: key.category,
                    choice: Choice::Questions(vec![key.index]),
                }),
            }
        }
        selection
    }

    /// Explicitly chosen keys in the order supplied.
    pub fn explicit_keys(&self) -> Vec<QuestionKey> {
        self.entries
            .iter()
            .flat_map(|entry| match &entry.choice {
                Choice::Questions(indices) => indices
                    .iter()
                    .map(|&index| QuestionKey::new(entry.category.clone(), index))
                    .collect(),
                Choice::WholeCategory => Vec::new(),
            })
            .collect()
    }

    /// Every category mentioned, first mention first.
    pub fn categories(&self) -> Vec<CategoryId> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(entry.category.clone()))
            .map(|entry| entry.category.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// A new item was appended to the queue.
    Replaced(QuestionItem),
    /// The bank had nothing left; the session runs one question short.
    Unavailable,
}

impl Replacement {
    pub fn item(&self) -> Option<&QuestionItem> {
        match self {
            Replacement::Replaced(item) => Some(item),
            Replacement::Unavailable => None,
        }
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, Replacement::Replaced(_))
    }
}

/// Owns allocation policy over one question bank.
pub struct AllocationController<'a> {
    bank: &'a QuestionBank,
}

impl<'a> AllocationController<'a> {
    pub fn new(bank: &'a QuestionBank) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &QuestionBank {
        self.bank
    }

    /// Build a fresh session of `target_size` questions.
    ///
    /// Explicit questions go first, in the order supplied. The rest is drawn
    /// round-robin from the selected categories, then round-robin from the
    /// whole bank once those run dry.
    pub fn initialize(
        &self,
        selection: &Selection,
        target_size: usize,
    ) -> Result<AssessmentSession, AllocationError> {
        let explicit = selection.explicit_keys();
        if target_size == 0 || target_size < explicit.len() {
            return Err(AllocationError::InvalidTargetSize {
                target_size,
                selected: explicit.len(),
            });
        }

        let mut chosen: Vec<&BankCategory> = Vec::new();
        for id in selection.categories() {
            let category = self
                .bank
                .category(&id)
                .ok_or(AllocationError::UnknownCategory(id))?;
            chosen.push(category);
        }

        let mut session = AssessmentSession::new(target_size);
        for key in &explicit {
            if session.is_used(key) {
                return Err(AllocationError::DuplicateSelection(key.clone()));
            }
            let item = self
                .bank
                .item(key, Origin::UserSelected)
                .ok_or_else(|| AllocationError::UnknownQuestion(key.clone()))?;
            session.enqueue(item);
        }

        self.draw_round_robin(&chosen, &mut session);

        if session.queue().len() < target_size {
            if !chosen.is_empty() {
                tracing::warn!(
                    drawn = session.queue().len(),
                    target_size,
                    "selected categories exhausted, drawing from the full bank"
                );
            }
            let all: Vec<&BankCategory> = self.bank.categories().collect();
            self.draw_round_robin(&all, &mut session);
        }

        if session.queue().len() < target_size {
            return Err(AllocationError::InsufficientQuestions {
                needed: target_size,
                available: session.queue().len(),
            });
        }

        tracing::info!(
            bank = self.bank.id(),
            target_size,
            user_selected = explicit.len(),
            system_selected = session.system_selected_count(),
            "session initialized"
        );
        Ok(session)
    }

    /// Skip `key` and append a replacement.
    ///
    /// The replacement is the first unused question of the same category in
    /// draw order, else the first unused question of any other category.
    pub fn replace(
        &self,
        session: &mut AssessmentSession,
        key: &QuestionKey,
    ) -> Result<Replacement, AllocationError> {
        let invalid = |reason: &str| AllocationError::InvalidSkipTarget {
            key: key.clone(),
            reason: reason.to_string(),
        };
        match session.state_of(key) {
            None => return Err(invalid("not in the session queue")),
            Some(ItemState::Skipped) => return Err(invalid("already skipped")),
            Some(ItemState::Answered) => return Err(invalid("already answered")),
            Some(ItemState::Pending) => {}
        }

        session.mark_skipped(key);

        let same_category = self
            .bank
            .category(&key.category)
            .and_then(|category| category.keys().find(|k| !session.is_used(k)));
        let found = same_category.or_else(|| {
            self.bank
                .categories()
                .filter(|category| category.id() != &key.category)
                .flat_map(|category| category.keys())
                .find(|k| !session.is_used(k))
        });

        let Some(next) = found else {
            session.note_unresolved_skip();
            tracing::warn!(
                skipped = %key,
                unresolved = session.unresolved_skips(),
                "no replacement available, session runs short"
            );
            return Ok(Replacement::Unavailable);
        };

        let item = self
            .bank
            .item(&next, Origin::SystemSelected)
            .ok_or_else(|| AllocationError::UnknownQuestion(next.clone()))?;
        tracing::debug!(skipped = %key, replacement = %item.key, "skip replaced");
        session.enqueue(item.clone());
        Ok(Replacement::Replaced(item))
    }

    pub fn current_progress(&self, session: &AssessmentSession) -> Progress {
        session.progress()
    }

    /// Fill the session round-robin from `categories`, one unused question
    /// per category per pass, until it reaches its target or they run dry.
    fn draw_round_robin(&self, categories: &[&BankCategory], session: &mut AssessmentSession) {
        let target = session.target_size();
        let mut pools: Vec<Vec<QuestionKey>> = categories
            .iter()
            .map(|category| {
                let mut keys: Vec<QuestionKey> = category.keys().collect();
                keys.reverse();
                keys
            })
            .collect();

        while session.queue().len() < target {
            let mut drew = false;
            for pool in &mut pools {
                if session.queue().len() >= target {
                    break;
                }
                while let Some(key) = pool.pop() {
                    if session.is_used(&key) {
                        continue;
                    }
                    if let Some(item) = self.bank.item(&key, Origin::SystemSelected) {
                        tracing::debug!(key = %item.key, "drew question");
                        session.enqueue(item);
                        drew = true;
                        break;
                    }
                }
            }
            if !drew {
                break;
            }
        }
    }
}
