//! The `matchscan validate` command.

use std::path::PathBuf;

use anyhow::Result;

use matchscan_core::bank::{load_bank, load_bank_directory, validate_bank, BankDirectory};

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let found = if bank_path.is_dir() {
        load_bank_directory(&bank_path)?
    } else {
        BankDirectory {
            banks: vec![load_bank(&bank_path)?],
            skipped: Vec::new(),
        }
    };

    let mut problems = found.skipped.len();
    for (path, error) in &found.skipped {
        println!("{}: not loaded: {error}", path.display());
    }

    for bank in &found.banks {
        println!(
            "Bank: {} ({} categories, {} questions)",
            bank.name(),
            bank.descriptors().len(),
            bank.total_questions()
        );

        let warnings = validate_bank(bank);
        for warning in &warnings {
            match &warning.category {
                Some(id) => println!("  [{id}] WARNING: {}", warning.message),
                None => println!("  WARNING: {}", warning.message),
            }
        }
        problems += warnings.len();
    }

    if problems == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{problems} problem(s) found.");
    }

    Ok(())
}
