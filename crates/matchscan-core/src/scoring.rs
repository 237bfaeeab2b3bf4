//! Compatibility scoring and classification.
//!
//! A [`RatingScale`] maps each rating level to an evenly spaced weight in
//! `0..=100`; the score of an answer set is the rounded mean weight. A
//! [`BandTable`] partitions `0..=100` into the five [`Compatibility`]
//! outcomes. Both tables are configuration, injected through
//! [`ScoringEngine::new`].

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::model::Rating;
use crate::record::AnswerRecord;

/// Ordered rating levels in use by a flow, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rating>", into = "Vec<Rating>")]
pub struct RatingScale {
    levels: Vec<Rating>,
}

impl RatingScale {
    pub fn new(levels: Vec<Rating>) -> Result<Self, ScoringError> {
        if levels.len() < 2 {
            return Err(ScoringError::InvalidScale(format!(
                "need at least 2 levels, got {}",
                levels.len()
            )));
        }
        if let Some(pair) = levels.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ScoringError::InvalidScale(format!(
                "levels must be distinct and best first: {} before {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { levels })
    }

    /// `strong-match / good / neutral / yellow-flag / red-flag`: 100/75/50/25/0.
    pub fn five_level() -> Self {
        Self {
            levels: Rating::ALL.to_vec(),
        }
    }

    /// `strong-match / good / yellow-flag / red-flag`: 100/67/33/0.
    pub fn four_level() -> Self {
        Self {
            levels: vec![
                Rating::StrongMatch,
                Rating::Good,
                Rating::YellowFlag,
                Rating::RedFlag,
            ],
        }
    }

    pub fn levels(&self) -> &[Rating] {
        &self.levels
    }

    /// Weight of `rating`, evenly spaced from 100 (best) down to 0 (worst).
    pub fn weight(&self, rating: Rating) -> Result<u8, ScoringError> {
        let position = self
            .levels
            .iter()
            .position(|&level| level == rating)
            .ok_or_else(|| ScoringError::UnknownRating(rating.to_string()))?;
        let steps = self.levels.len() - 1;
        let above_worst = steps - position;
        Ok(((200 * above_worst + steps) / (2 * steps)) as u8)
    }

    /// The level one step better than `rating`, if any.
    pub fn raise(&self, rating: Rating) -> Option<Rating> {
        let position = self.levels.iter().position(|&level| level == rating)?;
        position.checked_sub(1).map(|p| self.levels[p])
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::five_level()
    }
}

impl TryFrom<Vec<Rating>> for RatingScale {
    type Error = ScoringError;

    fn try_from(levels: Vec<Rating>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<RatingScale> for Vec<Rating> {
    fn from(scale: RatingScale) -> Self {
        scale.levels
    }
}

/// Discrete outcome of an assessment, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compatibility {
    HighPotential,
    WorthExploring,
    MixedSignals,
    Caution,
    HighRisk,
}

impl Compatibility {
    pub const ALL: [Compatibility; 5] = [
        Compatibility::HighPotential,
        Compatibility::WorthExploring,
        Compatibility::MixedSignals,
        Compatibility::Caution,
        Compatibility::HighRisk,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Compatibility::HighPotential => "high-potential",
            Compatibility::WorthExploring => "worth-exploring",
            Compatibility::MixedSignals => "mixed-signals",
            Compatibility::Caution => "caution",
            Compatibility::HighRisk => "high-risk",
        }
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Compatibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Compatibility::ALL
            .into_iter()
            .find(|c| c.label() == normalized)
            .ok_or_else(|| format!("unknown compatibility category: {s}"))
    }
}

/// Lower edge (inclusive) of one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub category: Compatibility,
    pub min: u8,
}

/// Partition of `0..=100` into one band per [`Compatibility`].
///
/// Each band runs from its `min` up to just below the next better band's
/// `min`, so the table can only be contiguous; validation ensures it is
/// also exhaustive and non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct BandTable {
    /// Best band first.
    bands: Vec<Band>,
}

impl BandTable {
    pub fn new(mut bands: Vec<Band>) -> Result<Self, ScoringError> {
        bands.sort_by_key(|band| band.category);
        let categories: Vec<Compatibility> = bands.iter().map(|b| b.category).collect();
        if categories != Compatibility::ALL {
            return Err(ScoringError::InvalidBands(
                "need exactly one band per compatibility category".into(),
            ));
        }
        if let Some(band) = bands.iter().find(|band| band.min > 100) {
            return Err(ScoringError::InvalidBands(format!(
                "{} starts above 100 at {}",
                band.category, band.min
            )));
        }
        if let Some(pair) = bands.windows(2).find(|pair| pair[0].min <= pair[1].min) {
            return Err(ScoringError::InvalidBands(format!(
                "{} (min {}) must start above {} (min {})",
                pair[0].category, pair[0].min, pair[1].category, pair[1].min
            )));
        }
        if let Some(last) = bands.last().filter(|band| band.min != 0) {
            return Err(ScoringError::InvalidBands(format!(
                "{} must start at 0, not {}",
                last.category, last.min
            )));
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn classify(&self, score: u8) -> Result<Compatibility, ScoringError> {
        if score > 100 {
            return Err(ScoringError::ScoreOutOfRange(u32::from(score)));
        }
        self.bands
            .iter()
            .find(|band| score >= band.min)
            .map(|band| band.category)
            .ok_or(ScoringError::ScoreOutOfRange(u32::from(score)))
    }

    /// Inclusive score range covered by `category`.
    pub fn range_of(&self, category: Compatibility) -> RangeInclusive<u8> {
        let index = self
            .bands
            .iter()
            .position(|band| band.category == category)
            .unwrap_or(self.bands.len() - 1);
        let upper = match index {
            0 => 100,
            i => self.bands[i - 1].min - 1,
        };
        self.bands[index].min..=upper
    }
}

impl Default for BandTable {
    /// `>=85` high-potential, `>=65` worth-exploring, `>=45` mixed-signals,
    /// `>=25` caution, else high-risk.
    fn default() -> Self {
        Self {
            bands: vec![
                Band {
                    category: Compatibility::HighPotential,
                    min: 85,
                },
                Band {
                    category: Compatibility::WorthExploring,
                    min: 65,
                },
                Band {
                    category: Compatibility::MixedSignals,
                    min: 45,
                },
                Band {
                    category: Compatibility::Caution,
                    min: 25,
                },
                Band {
                    category: Compatibility::HighRisk,
                    min: 0,
                },
            ],
        }
    }
}

impl TryFrom<Vec<Band>> for BandTable {
    type Error = ScoringError;

    fn try_from(bands: Vec<Band>) -> Result<Self, Self::Error> {
        Self::new(bands)
    }
}

impl From<BandTable> for Vec<Band> {
    fn from(table: BandTable) -> Self {
        table.bands
    }
}

/// Stateless scorer over one rating scale and band table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoringEngine {
    scale: RatingScale,
    bands: BandTable,
}

impl ScoringEngine {
    pub fn new(scale: RatingScale, bands: BandTable) -> Self {
        Self { scale, bands }
    }

    pub fn scale(&self) -> &RatingScale {
        &self.scale
    }

    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    /// Rounded mean weight of `ratings`, half up.
    pub fn score(&self, ratings: impl IntoIterator<Item = Rating>) -> Result<u8, ScoringError> {
        let mut total = 0usize;
        let mut count = 0usize;
        for rating in ratings {
            total += usize::from(self.scale.weight(rating)?);
            count += 1;
        }
        if count == 0 {
            return Err(ScoringError::EmptyAnswerSet);
        }
        Ok(((2 * total + count) / (2 * count)) as u8)
    }

    pub fn classify(&self, score: u8) -> Result<Compatibility, ScoringError> {
        self.bands.classify(score)
    }

    /// Score and classify in one step.
    pub fn evaluate(
        &self,
        ratings: impl IntoIterator<Item = Rating>,
    ) -> Result<(u8, Compatibility), ScoringError> {
        let score = self.score(ratings)?;
        Ok((score, self.classify(score)?))
    }

    /// Parse rating labels and score them.
    pub fn score_labels<S: AsRef<str>>(&self, labels: &[S]) -> Result<u8, ScoringError> {
        let ratings = labels
            .iter()
            .map(|label| label.as_ref().parse::<Rating>())
            .collect::<Result<Vec<_>, _>>()?;
        self.score(ratings)
    }
}

/// Count of each rating within one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RatingCounts {
    pub strong_match: usize,
    pub good: usize,
    pub neutral: usize,
    pub yellow_flag: usize,
    pub red_flag: usize,
}

impl RatingCounts {
    pub fn add(&mut self, rating: Rating) {
        *self.slot(rating) += 1;
    }

    pub fn get(&self, rating: Rating) -> usize {
        match rating {
            Rating::StrongMatch => self.strong_match,
            Rating::Good => self.good,
            Rating::Neutral => self.neutral,
            Rating::YellowFlag => self.yellow_flag,
            Rating::RedFlag => self.red_flag,
        }
    }

    pub fn total(&self) -> usize {
        Rating::ALL.iter().map(|&r| self.get(r)).sum()
    }

    fn slot(&mut self, rating: Rating) -> &mut usize {
        match rating {
            Rating::StrongMatch => &mut self.strong_match,
            Rating::Good => &mut self.good,
            Rating::Neutral => &mut self.neutral,
            Rating::YellowFlag => &mut self.yellow_flag,
            Rating::RedFlag => &mut self.red_flag,
        }
    }
}

/// Rating counts per category name.
pub type CategoryBreakdown = BTreeMap<String, RatingCounts>;

pub fn category_breakdown(answers: &[AnswerRecord]) -> CategoryBreakdown {
    let mut breakdown = CategoryBreakdown::new();
    for answer in answers {
        breakdown
            .entry(answer.category.clone())
            .or_default()
            .add(answer.rating);
    }
    breakdown
}
