//! The `matchscan init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_unless_present(Path::new("matchscan.toml"), SAMPLE_CONFIG)?;
    std::fs::create_dir_all("question-banks")?;
    write_unless_present(Path::new("question-banks/example.toml"), EXAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Edit matchscan.toml to set tier sizes and score bands");
    println!("  2. Run: matchscan validate --bank question-banks/example.toml");
    println!("  3. Run: matchscan plan --bank question-banks/example.toml --target 6");

    Ok(())
}

fn write_unless_present(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# matchscan configuration

version = "1"
default_tier = "free"

[tiers]
free = 15
premium = 25
exclusive = 45

[scoring]
levels = ["strong-match", "good", "neutral", "yellow-flag", "red-flag"]

[[scoring.bands]]
category = "high-potential"
min = 85

[[scoring.bands]]
category = "worth-exploring"
min = 65

[[scoring.bands]]
category = "mixed-signals"
min = 45

[[scoring.bands]]
category = "caution"
min = 25

[[scoring.bands]]
category = "high-risk"
min = 0
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Bank"
version = "1"

[[categories]]
id = "values"
name = "Values"
icon = "compass"
questions = [
    "What matters most to them in a partner?",
    "How do they talk about honesty?",
    "Who do they admire, and why?",
    "What would they never compromise on?",
]

[[categories]]
id = "lifestyle"
name = "Lifestyle"
icon = "sun"
questions = [
    "How do they spend a free weekend?",
    "Are they an early riser or a night owl?",
    "How often do they want to travel?",
    "How much time alone do they need?",
]
"#;
