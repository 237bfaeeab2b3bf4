//! Subcommand implementations.

pub mod categories;
pub mod compare;
pub mod init;
pub mod plan;
pub mod score;
pub mod simulate;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use matchscan_core::allocation::{AllocationController, Selection};
use matchscan_core::bank::{load_bank, QuestionBank};
use matchscan_core::config::{load_config_from, EngineConfig};
use matchscan_core::model::QuestionKey;
use matchscan_core::session::AssessmentSession;

/// Options shared by every command that builds a session.
#[derive(Args)]
pub struct PlanArgs {
    /// Path to the question bank TOML
    #[arg(long)]
    pub bank: PathBuf,

    /// Subscription tier that sets the session size
    #[arg(long, conflicts_with = "target")]
    pub tier: Option<String>,

    /// Explicit session size, overriding the tier
    #[arg(long)]
    pub target: Option<usize>,

    /// Hand-picked questions (e.g. "values:0,finances:3")
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Whole categories to draw from (e.g. "values,family")
    #[arg(long, value_delimiter = ',')]
    pub category: Vec<String>,

    /// Shuffle the bank's draw order with this seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Everything a command needs to run a freshly planned session.
pub struct Planned {
    pub config: EngineConfig,
    pub bank: QuestionBank,
    pub selection: Selection,
    pub target_size: usize,
}

impl PlanArgs {
    pub fn load(&self) -> Result<Planned> {
        let config = load_config_from(self.config.as_deref())?;
        let target_size = match self.target {
            Some(n) => n,
            None => config.target_size(self.tier.as_deref())?,
        };

        let bank = load_bank(&self.bank)?;
        let bank = match self.seed {
            Some(seed) => bank.shuffled(seed),
            None => bank,
        };

        let mut selection = Selection::from_keys(parse_keys(&self.select)?);
        for category in self.category.iter().filter(|c| !c.trim().is_empty()) {
            selection = selection.whole_category(category.trim());
        }

        Ok(Planned {
            config,
            bank,
            selection,
            target_size,
        })
    }
}

impl Planned {
    pub fn initialize(&self) -> Result<AssessmentSession> {
        AllocationController::new(&self.bank)
            .initialize(&self.selection, self.target_size)
            .with_context(|| format!("cannot plan a session from bank '{}'", self.bank.id()))
    }
}

fn parse_keys(raw: &[String]) -> Result<Vec<QuestionKey>> {
    raw.iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<QuestionKey>()
                .map_err(|e| anyhow::anyhow!("invalid --select entry: {e}"))
        })
        .collect()
}
