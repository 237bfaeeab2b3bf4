//! The `matchscan categories` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use matchscan_core::bank::load_bank;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let bank = load_bank(&bank_path)?;

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Icon", "Questions"]);
    for descriptor in bank.descriptors() {
        table.add_row(vec![
            Cell::new(&descriptor.id),
            Cell::new(&descriptor.display_name),
            Cell::new(&descriptor.icon),
            Cell::new(descriptor.question_count),
        ]);
    }

    println!("{} (v{})", bank.name(), bank.version());
    println!("{table}");
    println!(
        "{} categories, {} questions",
        bank.descriptors().len(),
        bank.total_questions()
    );

    Ok(())
}
