//! Core data model types for matchscan.
//!
//! These are the identifiers and value types shared by the question bank,
//! the allocation controller and the scoring engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScoringError;

/// Identifier of one question category (e.g. `values`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CategoryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stable identifier of one question: its category plus its position in
/// that category as written in the bank.
///
/// The textual form is `category:index`, e.g. `values:3`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionKey {
    pub category: CategoryId,
    pub index: usize,
}

impl QuestionKey {
    pub fn new(category: impl Into<CategoryId>, index: usize) -> Self {
        Self {
            category: category.into(),
            index,
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.index)
    }
}

impl FromStr for QuestionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, index) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| format!("expected `category:index`, got '{s}'"))?;
        if category.is_empty() {
            return Err(format!("missing category in '{s}'"));
        }
        let index = index
            .parse::<usize>()
            .map_err(|_| format!("invalid question index in '{s}'"))?;
        Ok(QuestionKey::new(category, index))
    }
}

/// Who put a question into the queue. Informational only; scoring ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    UserSelected,
    SystemSelected,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::UserSelected => write!(f, "user-selected"),
            Origin::SystemSelected => write!(f, "system-selected"),
        }
    }
}

/// One question placed into a session queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionItem {
    pub key: QuestionKey,
    pub category_name: String,
    pub text: String,
    pub origin: Origin,
}

impl QuestionItem {
    pub fn category_id(&self) -> &CategoryId {
        &self.key.category
    }
}

/// Read-only summary of one bank category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub id: CategoryId,
    pub display_name: String,
    pub icon: String,
    pub question_count: usize,
}

/// Categorical rating given to one answered question, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    StrongMatch,
    Good,
    Neutral,
    YellowFlag,
    RedFlag,
}

impl Rating {
    /// Every rating, best first.
    pub const ALL: [Rating; 5] = [
        Rating::StrongMatch,
        Rating::Good,
        Rating::Neutral,
        Rating::YellowFlag,
        Rating::RedFlag,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Rating::StrongMatch => "strong-match",
            Rating::Good => "good",
            Rating::Neutral => "neutral",
            Rating::YellowFlag => "yellow-flag",
            Rating::RedFlag => "red-flag",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rating {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "strong-match" | "strong" => Ok(Rating::StrongMatch),
            "good" => Ok(Rating::Good),
            "neutral" => Ok(Rating::Neutral),
            "yellow-flag" | "yellow" => Ok(Rating::YellowFlag),
            "red-flag" | "red" => Ok(Rating::RedFlag),
            other => Err(ScoringError::UnknownRating(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_key_display_and_parse() {
        let key = QuestionKey::new("values", 3);
        assert_eq!(key.to_string(), "values:3");
        assert_eq!("values:3".parse::<QuestionKey>().unwrap(), key);
        assert_eq!(
            " life-goals:0 ".parse::<QuestionKey>().unwrap(),
            QuestionKey::new("life-goals", 0)
        );
        assert!("values".parse::<QuestionKey>().is_err());
        assert!(":2".parse::<QuestionKey>().is_err());
        assert!("values:x".parse::<QuestionKey>().is_err());
    }

    #[test]
    fn rating_display_and_parse() {
        assert_eq!(Rating::StrongMatch.to_string(), "strong-match");
        assert_eq!("good".parse::<Rating>().unwrap(), Rating::Good);
        assert_eq!("Yellow_Flag".parse::<Rating>().unwrap(), Rating::YellowFlag);
        assert_eq!("red".parse::<Rating>().unwrap(), Rating::RedFlag);
        assert_eq!(
            "meh".parse::<Rating>(),
            Err(ScoringError::UnknownRating("meh".into()))
        );
    }

    #[test]
    fn rating_order_is_best_first() {
        assert!(Rating::StrongMatch < Rating::Good);
        assert!(Rating::YellowFlag < Rating::RedFlag);
        let mut sorted = Rating::ALL;
        sorted.sort();
        assert_eq!(sorted, Rating::ALL);
    }

    #[test]
    fn question_item_serde_roundtrip() {
        let item = QuestionItem {
            key: QuestionKey::new("values", 1),
            category_name: "Core Values".into(),
            text: "Do you want children?".into(),
            origin: Origin::SystemSelected,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"system-selected\""));
        let back: QuestionItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
        assert_eq!(back.category_id().as_str(), "values");
    }
}
