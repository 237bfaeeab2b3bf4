//! The `matchscan simulate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use matchscan_core::allocation::{AllocationController, Replacement};
use matchscan_core::model::Rating;
use matchscan_core::record::{finish, FinishedScan};

use super::PlanArgs;

pub fn execute(
    args: PlanArgs,
    answers: String,
    subject: String,
    interaction: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let planned = args.load()?;
    let engine = planned.config.scoring_engine();
    let controller = AllocationController::new(&planned.bank);
    let mut session = planned.initialize()?;

    let tokens: Vec<&str> = answers
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        let Some(current) = session.current().map(|item| item.key.clone()) else {
            tracing::warn!(
                ignored = tokens.len() - i,
                "session complete, extra answers ignored"
            );
            break;
        };

        if token.eq_ignore_ascii_case("skip") {
            match controller.replace(&mut session, &current)? {
                Replacement::Replaced(item) => {
                    println!("Skipped {current}, replaced by {}", item.key)
                }
                Replacement::Unavailable => println!("Skipped {current}, no replacement available"),
            }
        } else {
            let rating: Rating = token
                .parse()
                .with_context(|| format!("answer {} is not a rating", i + 1))?;
            session.record_answer(&current, rating, None)?;
        }
    }

    if !session.is_complete() {
        let progress = session.progress();
        println!(
            "Finishing early after {} of {} questions",
            progress.answered_count, progress.target_size
        );
        session.finish_early();
    }

    let finished = finish(&session, &engine, &subject, &interaction)?;
    print_summary(&finished);

    if let Some(path) = output {
        finished.record.save_json(&path)?;
        println!("Scan written to {}", path.display());
    }

    Ok(())
}

fn print_summary(finished: &FinishedScan) {
    let record = &finished.record;
    println!("\n{} ({})", record.subject_name, record.interaction_type);
    println!("Score: {}", record.score);
    println!("Category: {}", record.category);

    let mut table = Table::new();
    let mut header = vec!["Category".to_string()];
    header.extend(Rating::ALL.iter().map(|r| r.label().to_string()));
    table.set_header(header);
    for (category, counts) in &finished.breakdown {
        let mut row = vec![Cell::new(category)];
        row.extend(Rating::ALL.iter().map(|&r| Cell::new(counts.get(r))));
        table.add_row(row);
    }
    println!("{table}");

    if !record.categories_completed.is_empty() {
        println!("Completed: {}", record.categories_completed.join(", "));
    }
    if let Some(note) = finished.shortfall_note() {
        println!("Note: {note}");
    }
}
