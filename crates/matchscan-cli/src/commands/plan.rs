//! The `matchscan plan` command.

use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;

use matchscan_core::model::QuestionItem;
use matchscan_core::session::Progress;

use super::PlanArgs;

#[derive(Serialize)]
struct PlanOutput<'a> {
    bank: &'a str,
    version: &'a str,
    target_size: usize,
    system_selected: usize,
    progress: Progress,
    queue: &'a [QuestionItem],
}

pub fn execute(args: PlanArgs, format: String) -> Result<()> {
    let planned = args.load()?;
    let session = planned.initialize()?;

    match format.as_str() {
        "json" => {
            let output = PlanOutput {
                bank: planned.bank.id(),
                version: planned.bank.version(),
                target_size: session.target_size(),
                system_selected: session.system_selected_count(),
                progress: session.progress(),
                queue: session.queue(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!(
                "Bank: {} (v{}), {} questions planned",
                planned.bank.name(),
                planned.bank.version(),
                session.target_size()
            );

            let mut table = Table::new();
            table.set_header(vec!["#", "Key", "Category", "Origin", "Question"]);
            for (i, item) in session.queue().iter().enumerate() {
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(&item.key),
                    Cell::new(&item.category_name),
                    Cell::new(item.origin),
                    Cell::new(&item.text),
                ]);
            }
            println!("{table}");
            println!(
                "{} user-selected, {} system-selected",
                session.queue().len() - session.system_selected_count(),
                session.system_selected_count()
            );
        }
    }

    Ok(())
}
