//! Engine configuration: tier sizes, rating scale and band table.
//!
//! These tables change with the product, not with the engine, so they are
//! loaded from TOML and injected when a session or scorer is created.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::{BandTable, RatingScale, ScoringEngine};

/// Scoring tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Rating levels in use, best first.
    #[serde(default)]
    pub levels: RatingScale,
    /// One lower edge per compatibility category.
    #[serde(default)]
    pub bands: BandTable,
}

/// Top-level matchscan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version tag of these tables, recorded for audits.
    #[serde(default = "default_version")]
    pub version: String,
    /// Tier used when the caller names none.
    #[serde(default = "default_tier")]
    pub default_tier: String,
    /// Questions per session, keyed by subscription tier.
    #[serde(default = "default_tiers")]
    pub tiers: BTreeMap<String, usize>,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_version() -> String {
    "1".to_string()
}
fn default_tier() -> String {
    "free".to_string()
}
fn default_tiers() -> BTreeMap<String, usize> {
    BTreeMap::from([
        ("free".to_string(), 15),
        ("premium".to_string(), 25),
        ("exclusive".to_string(), 45),
    ])
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_tier: default_tier(),
            tiers: default_tiers(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Target session size for `tier`, or for the default tier.
    pub fn target_size(&self, tier: Option<&str>) -> Result<usize> {
        let tier = tier.unwrap_or(&self.default_tier);
        self.tiers.get(tier).copied().with_context(|| {
            format!(
                "unknown tier '{tier}'. Available: {}",
                self.tiers.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    pub fn scoring_engine(&self) -> ScoringEngine {
        ScoringEngine::new(self.scoring.levels.clone(), self.scoring.bands.clone())
    }

    /// Check the tier table. Scale and bands are validated on load.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.tiers.is_empty(), "tier table is empty");
        if let Some((tier, _)) = self.tiers.iter().find(|(_, &size)| size == 0) {
            anyhow::bail!("tier '{tier}' has a target size of 0");
        }
        anyhow::ensure!(
            self.tiers.contains_key(&self.default_tier),
            "default tier '{}' is not in the tier table",
            self.default_tier
        );
        Ok(())
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `matchscan.toml` in the current directory
/// 2. `~/.config/matchscan/config.toml`
///
/// Environment variable override: `MATCHSCAN_DEFAULT_TIER`.
pub fn load_config() -> Result<EngineConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<EngineConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("matchscan.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => parse_config_file(path)?,
        None => EngineConfig::default(),
    };

    if let Ok(tier) = std::env::var("MATCHSCAN_DEFAULT_TIER") {
        if !tier.trim().is_empty() {
            config.default_tier = tier.trim().to_string();
        }
    }

    config.validate().with_context(|| match &config_path {
        Some(path) => format!("invalid config: {}", path.display()),
        None => "invalid config".to_string(),
    })?;

    tracing::debug!(
        version = %config.version,
        source = ?config_path,
        default_tier = %config.default_tier,
        "config loaded"
    );
    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<EngineConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("matchscan"))
}
