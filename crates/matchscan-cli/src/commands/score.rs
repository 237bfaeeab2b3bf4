//! The `matchscan score` command.

use std::path::PathBuf;

use anyhow::Result;

use matchscan_core::config::load_config_from;
use matchscan_core::model::Rating;

pub fn execute(ratings: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let engine = config.scoring_engine();

    let ratings = ratings
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Rating>)
        .collect::<Result<Vec<_>, _>>()?;

    let (score, category) = engine.evaluate(ratings.iter().copied())?;
    let range = engine.bands().range_of(category);

    println!("Score: {score}");
    println!("Category: {category} ({}-{})", range.start(), range.end());
    println!("Answers: {}", ratings.len());

    Ok(())
}
