//! Finished scan records with JSON persistence and scan-to-scan comparison.
//!
//! [`MatchScan`] is the shape history views, comparisons and the dual-party
//! reveal read back, so its field names are fixed (camelCase on the wire).

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoringError;
use crate::model::{QuestionItem, QuestionKey, Rating};
use crate::scoring::{category_breakdown, CategoryBreakdown, Compatibility, ScoringEngine};
use crate::session::{AssessmentSession, ItemState};

/// One answered question as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    pub rating: Rating,
    /// Category display name.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A finished evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScan {
    pub id: Uuid,
    pub subject_name: String,
    pub date: DateTime<Utc>,
    pub score: u8,
    pub category: Compatibility,
    pub interaction_type: String,
    pub answers: Vec<AnswerRecord>,
    /// Category names whose queued questions were all answered or skipped,
    /// with at least one answer, in queue order.
    #[serde(default)]
    pub categories_completed: Vec<String>,
}

/// Everything a host shows when a session ends.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedScan {
    pub record: MatchScan,
    pub breakdown: CategoryBreakdown,
    /// The session's planned size.
    pub planned: usize,
    /// Skips the bank could not back-fill.
    pub shortfall: usize,
}

impl FinishedScan {
    /// Informational note for sessions that ran short.
    pub fn shortfall_note(&self) -> Option<String> {
        (self.shortfall > 0).then(|| {
            format!(
                "fewer questions than planned were available ({} of {})",
                self.planned - self.shortfall,
                self.planned
            )
        })
    }
}

/// Score a session and build its finished record.
///
/// Works on complete and early-finished sessions alike; only answered
/// questions count.
pub fn finish(
    session: &AssessmentSession,
    engine: &ScoringEngine,
    subject_name: &str,
    interaction_type: &str,
) -> Result<FinishedScan, ScoringError> {
    let items: HashMap<&QuestionKey, &QuestionItem> = session
        .queue()
        .iter()
        .map(|item| (&item.key, item))
        .collect();

    let answers: Vec<AnswerRecord> = session
        .answers()
        .iter()
        .filter_map(|answer| {
            items.get(&answer.key).map(|item| AnswerRecord {
                question: item.text.clone(),
                rating: answer.rating,
                category: item.category_name.clone(),
                notes: answer.note.clone(),
            })
        })
        .collect();

    let (score, category) = engine.evaluate(answers.iter().map(|a| a.rating))?;
    let breakdown = category_breakdown(&answers);

    let mut categories_completed: Vec<String> = Vec::new();
    let mut open: HashMap<&str, bool> = HashMap::new();
    for item in session.queue() {
        let pending = session.state_of(&item.key) == Some(ItemState::Pending);
        *open.entry(item.category_name.as_str()).or_insert(false) |= pending;
    }
    for item in session.queue() {
        let name = item.category_name.as_str();
        if open.get(name) == Some(&false)
            && breakdown.contains_key(name)
            && !categories_completed.iter().any(|c| c == name)
        {
            categories_completed.push(name.to_string());
        }
    }

    let record = MatchScan {
        id: Uuid::new_v4(),
        subject_name: subject_name.to_string(),
        date: Utc::now(),
        score,
        category,
        interaction_type: interaction_type.to_string(),
        answers,
        categories_completed,
    };

    tracing::info!(
        scan = %record.id,
        score,
        category = %category,
        answered = record.answers.len(),
        unresolved_skips = session.unresolved_skips(),
        "scan finished"
    );

    Ok(FinishedScan {
        record,
        breakdown,
        planned: session.target_size(),
        shortfall: session.unresolved_skips(),
    })
}

impl MatchScan {
    /// Save the record as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize scan")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write scan to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scan from {}", path.display()))?;
        let scan: MatchScan =
            serde_json::from_str(&content).context("failed to parse scan JSON")?;
        Ok(scan)
    }

    pub fn breakdown(&self) -> CategoryBreakdown {
        category_breakdown(&self.answers)
    }

    /// Per-category scores, by category name.
    pub fn category_scores(
        &self,
        engine: &ScoringEngine,
    ) -> Result<BTreeMap<String, u8>, ScoringError> {
        let mut grouped: BTreeMap<String, Vec<Rating>> = BTreeMap::new();
        for answer in &self.answers {
            grouped
                .entry(answer.category.clone())
                .or_default()
                .push(answer.rating);
        }
        grouped
            .into_iter()
            .map(|(name, ratings)| Ok((name, engine.score(ratings)?)))
            .collect()
    }

    /// Compare this scan against an earlier one.
    pub fn compare(
        &self,
        baseline: &MatchScan,
        engine: &ScoringEngine,
    ) -> Result<ScanComparison, ScoringError> {
        let baseline_scores = baseline.category_scores(engine)?;
        let current_scores = self.category_scores(engine)?;

        let mut per_category = Vec::new();
        let mut only_in_current = Vec::new();
        for (name, &current) in &current_scores {
            match baseline_scores.get(name) {
                Some(&before) => per_category.push(CategoryDelta {
                    category: name.clone(),
                    baseline_score: before,
                    current_score: current,
                    delta: i16::from(current) - i16::from(before),
                }),
                None => only_in_current.push(name.clone()),
            }
        }
        let only_in_baseline = baseline_scores
            .keys()
            .filter(|name| !current_scores.contains_key(*name))
            .cloned()
            .collect();

        Ok(ScanComparison {
            baseline_id: baseline.id,
            current_id: self.id,
            baseline_score: baseline.score,
            current_score: self.score,
            score_delta: i16::from(self.score) - i16::from(baseline.score),
            baseline_category: baseline.category,
            current_category: self.category,
            per_category,
            only_in_baseline,
            only_in_current,
        })
    }
}

/// Result of comparing two scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanComparison {
    pub baseline_id: Uuid,
    pub current_id: Uuid,
    pub baseline_score: u8,
    pub current_score: u8,
    pub score_delta: i16,
    pub baseline_category: Compatibility,
    pub current_category: Compatibility,
    /// Categories answered in both scans.
    pub per_category: Vec<CategoryDelta>,
    pub only_in_baseline: Vec<String>,
    pub only_in_current: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub category: String,
    pub baseline_score: u8,
    pub current_score: u8,
    pub delta: i16,
}

impl ScanComparison {
    pub fn category_changed(&self) -> bool {
        self.baseline_category != self.current_category
    }

    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} -> {} ({:+}), {} -> {}\n\n",
            self.baseline_score,
            self.current_score,
            self.score_delta,
            self.baseline_category,
            self.current_category
        ));

        if !self.per_category.is_empty() {
            md.push_str("| Category | Baseline | Current | Delta |\n");
            md.push_str("|----------|----------|---------|-------|\n");
            for c in &self.per_category {
                md.push_str(&format!(
                    "| {} | {} | {} | {:+} |\n",
                    c.category, c.baseline_score, c.current_score, c.delta
                ));
            }
            md.push('\n');
        }

        if !self.only_in_current.is_empty() {
            let added = self.only_in_current.join(", ");
            md.push_str(&format!("New categories: {added}\n"));
        }
        if !self.only_in_baseline.is_empty() {
            let dropped = self.only_in_baseline.join(", ");
            md.push_str(&format!("Dropped categories: {dropped}\n"));
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AllocationController, Selection};
    use crate::bank::{BankCategory, QuestionBank};

    fn bank() -> QuestionBank {
        QuestionBank::new(
            "test",
            "Test",
            "1",
            vec![
                BankCategory::new(
                    "values",
                    "Core Values",
                    "",
                    (0..3).map(|i| format!("values {i}")).collect(),
                ),
                BankCategory::new(
                    "lifestyle",
                    "Lifestyle",
                    "",
                    (0..3).map(|i| format!("lifestyle {i}")).collect(),
                ),
            ],
        )
        .unwrap()
    }

    fn make_scan(score: u8, answers: Vec<(&str, Rating)>) -> MatchScan {
        let engine = ScoringEngine::default();
        MatchScan {
            id: Uuid::nil(),
            subject_name: "Sam".into(),
            date: Utc::now(),
            score,
            category: engine.classify(score).unwrap(),
            interaction_type: "dating".into(),
            answers: answers
                .into_iter()
                .map(|(category, rating)| AnswerRecord {
                    question: format!("{category}?"),
                    rating,
                    category: category.into(),
                    notes: None,
                })
                .collect(),
            categories_completed: vec![],
        }
    }

    #[test]
    fn finish_scores_answered_items_only() {
        let bank = bank();
        let controller = AllocationController::new(&bank);
        let selection = Selection::new().whole_category("values");
        let mut session = controller.initialize(&selection, 4).unwrap();

        let ratings = [Rating::StrongMatch, Rating::Good, Rating::Neutral, Rating::RedFlag];
        let skipped = session.current().unwrap().key.clone();
        controller.replace(&mut session, &skipped).unwrap();
        for rating in ratings {
            let key = session.current().unwrap().key.clone();
            session
                .record_answer(&key, rating, Some("note".into()))
                .unwrap();
        }
        assert!(session.is_complete());

        let finished = finish(&session, &ScoringEngine::default(), "Sam", "dating").unwrap();
        assert_eq!(finished.record.score, 56);
        assert_eq!(finished.record.category, Compatibility::MixedSignals);
        let answers = &finished.record.answers;
        assert_eq!(answers.len(), 4);
        assert!(answers.iter().all(|a| a.question != "values 0"));
        assert_eq!(finished.shortfall, 0);
        assert_eq!(finished.shortfall_note(), None);
        assert_eq!(
            finished.record.categories_completed,
            vec!["Core Values".to_string(), "Lifestyle".to_string()]
        );
        let total: usize = finished.breakdown.values().map(|c| c.total()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn finish_early_and_empty() {
        let bank = bank();
        let controller = AllocationController::new(&bank);
        let mut session = controller.initialize(&Selection::new(), 4).unwrap();

        let engine = ScoringEngine::default();
        assert_eq!(
            finish(&session, &engine, "Sam", "dating").unwrap_err(),
            ScoringError::EmptyAnswerSet
        );

        let key = session.current().unwrap().key.clone();
        session.record_answer(&key, Rating::Good, None).unwrap();
        session.finish_early();
        let finished = finish(&session, &engine, "Sam", "dating").unwrap();
        assert_eq!(finished.record.score, 75);
        // values still has a pending item
        assert!(finished.record.categories_completed.is_empty());
    }

    #[test]
    fn shortfall_note_reports_missing_questions() {
        let bank = QuestionBank::new(
            "tiny",
            "Tiny",
            "1",
            vec![BankCategory::new("a", "A", "", vec!["one".into(), "two".into()])],
        )
        .unwrap();
        let controller = AllocationController::new(&bank);
        let mut session = controller.initialize(&Selection::new(), 2).unwrap();
        let first = session.queue()[0].key.clone();
        controller.replace(&mut session, &first).unwrap();
        let second = session.current().unwrap().key.clone();
        session.record_answer(&second, Rating::Good, None).unwrap();

        let finished = finish(&session, &ScoringEngine::default(), "Sam", "dating").unwrap();
        assert_eq!(finished.shortfall, 1);
        assert_eq!(
            finished.shortfall_note().unwrap(),
            "fewer questions than planned were available (1 of 2)"
        );
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let scan = make_scan(56, vec![("Core Values", Rating::Good)]);
        let json = serde_json::to_value(&scan).unwrap();
        for field in [
            "id",
            "subjectName",
            "date",
            "score",
            "category",
            "interactionType",
            "answers",
            "categoriesCompleted",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert_eq!(json["category"], "mixed-signals");
        assert_eq!(json["answers"][0]["rating"], "good");
        assert!(json["answers"][0].get("notes").is_none());
    }

    #[test]
    fn json_roundtrip() {
        let scan = make_scan(70, vec![("Core Values", Rating::Good)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans/scan.json");

        scan.save_json(&path).unwrap();
        let loaded = MatchScan::load_json(&path).unwrap();
        assert_eq!(loaded.score, 70);
        assert_eq!(loaded.answers, scan.answers);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MatchScan::load_json(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn compare_scans() {
        let engine = ScoringEngine::default();
        let baseline = make_scan(
            63,
            vec![
                ("Core Values", Rating::Good),
                ("Lifestyle", Rating::Neutral),
                ("Finances", Rating::RedFlag),
            ],
        );
        let current = make_scan(
            88,
            vec![
                ("Core Values", Rating::StrongMatch),
                ("Lifestyle", Rating::Neutral),
                ("Family", Rating::StrongMatch),
            ],
        );

        let comparison = current.compare(&baseline, &engine).unwrap();
        assert_eq!(comparison.score_delta, 25);
        assert!(comparison.category_changed());
        assert_eq!(comparison.only_in_baseline, vec!["Finances".to_string()]);
        assert_eq!(comparison.only_in_current, vec!["Family".to_string()]);

        let values = comparison
            .per_category
            .iter()
            .find(|c| c.category == "Core Values")
            .unwrap();
        assert_eq!(values.delta, 25);

        let md = comparison.to_markdown();
        assert!(md.contains("63 -> 88 (+25)"));
        assert!(md.contains("| Lifestyle | 50 | 50 | +0 |"));
        assert!(md.contains("Dropped categories: Finances"));
    }
}
