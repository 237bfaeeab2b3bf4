//! Question bank: the static, versioned set of questions grouped by category.
//!
//! Banks are loaded from TOML files. A question's [`QuestionKey`] is its
//! category plus its index as written in the file, so keys survive a
//! reshuffle of the draw order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::model::{CategoryDescriptor, CategoryId, Origin, QuestionItem, QuestionKey};

/// One category of questions inside a bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankCategory {
    id: CategoryId,
    name: String,
    icon: String,
    questions: Vec<String>,
    /// Permutation of `0..questions.len()` giving the draw order.
    draw_order: Vec<usize>,
}

impl BankCategory {
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        icon: impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        let draw_order = (0..questions.len()).collect();
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            questions,
            draw_order,
        }
    }

    pub fn id(&self) -> &CategoryId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question text by its stable index.
    pub fn question(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    /// Keys of this category in draw order.
    pub fn keys(&self) -> impl Iterator<Item = QuestionKey> + '_ {
        self.draw_order
            .iter()
            .map(move |&index| QuestionKey::new(self.id.clone(), index))
    }
}

/// An immutable question bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    id: String,
    name: String,
    version: String,
    /// Categories in draw order.
    categories: Vec<BankCategory>,
}

impl QuestionBank {
    /// Build a bank, rejecting duplicate category ids.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        categories: Vec<BankCategory>,
    ) -> Result<Self> {
        let id = id.into();
        let mut seen = HashSet::new();
        for category in &categories {
            if !seen.insert(category.id.clone()) {
                anyhow::bail!("bank '{id}' has duplicate category id: {}", category.id);
            }
        }
        Ok(Self {
            id,
            name: name.into(),
            version: version.into(),
            categories,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Categories in draw order.
    pub fn categories(&self) -> impl Iterator<Item = &BankCategory> {
        self.categories.iter()
    }

    pub fn category(&self, id: &CategoryId) -> Option<&BankCategory> {
        self.categories.iter().find(|c| &c.id == id)
    }

    pub fn question(&self, key: &QuestionKey) -> Option<&str> {
        self.category(&key.category)?.question(key.index)
    }

    pub fn contains(&self, key: &QuestionKey) -> bool {
        self.question(key).is_some()
    }

    pub fn total_questions(&self) -> usize {
        self.categories.iter().map(BankCategory::len).sum()
    }

    /// Every key in the bank, category by category, in draw order.
    pub fn keys(&self) -> impl Iterator<Item = QuestionKey> + '_ {
        self.categories.iter().flat_map(|c| c.keys())
    }

    /// Materialize a queue item for `key`.
    pub fn item(&self, key: &QuestionKey, origin: Origin) -> Option<QuestionItem> {
        let category = self.category(&key.category)?;
        let text = category.question(key.index)?;
        Some(QuestionItem {
            key: key.clone(),
            category_name: category.name.clone(),
            text: text.to_string(),
            origin,
        })
    }

    pub fn descriptors(&self) -> Vec<CategoryDescriptor> {
        self.categories
            .iter()
            .map(|c| CategoryDescriptor {
                id: c.id.clone(),
                display_name: c.name.clone(),
                icon: c.icon.clone(),
                question_count: c.len(),
            })
            .collect()
    }

    /// A copy of this bank with category order and per-category question
    /// order permuted once by `seed`. Keys and text are unchanged.
    pub fn shuffled(&self, seed: u64) -> QuestionBank {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bank = self.clone();
        bank.categories.shuffle(&mut rng);
        for category in &mut bank.categories {
            category.draw_order.shuffle(&mut rng);
        }
        tracing::debug!(bank = %bank.id, seed, "shuffled bank draw order");
        bank
    }
}

#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    categories: Vec<TomlCategory>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default = "default_version")]
    version: String,
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlCategory {
    id: String,
    name: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    questions: Vec<String>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn load_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let categories = parsed
        .categories
        .into_iter()
        .map(|c| BankCategory::new(c.id, c.name, c.icon, c.questions))
        .collect();

    QuestionBank::new(
        parsed.bank.id,
        parsed.bank.name,
        parsed.bank.version,
        categories,
    )
    .with_context(|| format!("invalid question bank: {}", source_path.display()))
}

/// Banks loaded from a directory tree.
#[derive(Debug, Default)]
pub struct BankDirectory {
    pub banks: Vec<QuestionBank>,
    /// `.toml` files that failed to load, with the error.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Recursively load all `.toml` banks from a directory.
///
/// Files that fail to load do not abort the scan; they are returned in
/// [`BankDirectory::skipped`].
pub fn load_bank_directory(dir: &Path) -> Result<BankDirectory> {
    let mut found = BankDirectory::default();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();

        if path.is_dir() {
            let nested = load_bank_directory(&path)?;
            found.banks.extend(nested.banks);
            found.skipped.extend(nested.skipped);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match load_bank(&path) {
                Ok(bank) => found.banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                    found.skipped.push((path, format!("{e:#}")));
                }
            }
        }
    }

    found.banks.sort_by(|a, b| a.id.cmp(&b.id));
    found.skipped.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The category (if applicable).
    pub category: Option<CategoryId>,
    pub message: String,
}

/// Validate a bank for content problems that do not break allocation.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.categories.is_empty() {
        warnings.push(ValidationWarning {
            category: None,
            message: "bank has no categories".into(),
        });
    }

    let mut first_seen: HashMap<String, QuestionKey> = HashMap::new();
    for category in &bank.categories {
        if category.is_empty() {
            warnings.push(ValidationWarning {
                category: Some(category.id.clone()),
                message: "category has no questions".into(),
            });
        }

        let mut in_category = HashSet::new();
        for (index, text) in category.questions.iter().enumerate() {
            let key = QuestionKey::new(category.id.clone(), index);
            let normalized = text.trim().to_lowercase();
            if normalized.is_empty() {
                warnings.push(ValidationWarning {
                    category: Some(category.id.clone()),
                    message: format!("question {key} is blank"),
                });
                continue;
            }
            if !in_category.insert(normalized.clone()) {
                warnings.push(ValidationWarning {
                    category: Some(category.id.clone()),
                    message: format!("question {key} duplicates an earlier question"),
                });
                continue;
            }
            match first_seen.get(&normalized) {
                Some(other) if other.category != category.id => {
                    warnings.push(ValidationWarning {
                        category: Some(category.id.clone()),
                        message: format!("question {key} has the same text as {other}"),
                    });
                }
                Some(_) => {}
                None => {
                    first_seen.insert(normalized, key);
                }
            }
        }
    }

    warnings
}
