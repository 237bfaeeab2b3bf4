//! The `matchscan compare` command.

use std::path::PathBuf;

use anyhow::Result;

use matchscan_core::config::load_config_from;
use matchscan_core::record::MatchScan;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let engine = load_config_from(config_path.as_deref())?.scoring_engine();
    let baseline = MatchScan::load_json(&baseline_path)?;
    let current = MatchScan::load_json(&current_path)?;

    let report = current.compare(&baseline, &engine)?;

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            // text format
            println!(
                "Score: {} -> {} ({:+})",
                report.baseline_score, report.current_score, report.score_delta
            );
            if report.category_changed() {
                println!(
                    "Category: {} -> {}",
                    report.baseline_category, report.current_category
                );
            } else {
                println!("Category: {} (unchanged)", report.current_category);
            }

            if !report.per_category.is_empty() {
                println!("\nPer category:");
                for c in &report.per_category {
                    println!(
                        "  {} {} -> {} ({:+})",
                        c.category, c.baseline_score, c.current_score, c.delta
                    );
                }
            }

            if !report.only_in_current.is_empty() {
                println!("\nNew categories: {}", report.only_in_current.join(", "));
            }
            if !report.only_in_baseline.is_empty() {
                println!("Dropped categories: {}", report.only_in_baseline.join(", "));
            }
        }
    }

    Ok(())
}
