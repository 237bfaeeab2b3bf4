//! matchscan CLI: plan, run and compare compatibility scans from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::PlanArgs;

#[derive(Parser)]
#[command(
    name = "matchscan",
    version,
    about = "Question allocation and compatibility scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a session queue and print it
    Plan {
        #[command(flatten)]
        plan: PlanArgs,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Run a session from a list of ratings and score it
    Simulate {
        #[command(flatten)]
        plan: PlanArgs,

        /// Ratings in queue order; "skip" skips the current question
        /// (e.g. "good,skip,red-flag,strong-match")
        #[arg(long)]
        answers: String,

        /// Name of the person being assessed
        #[arg(long, default_value = "Anonymous")]
        subject: String,

        /// Interaction type recorded on the scan
        #[arg(long, default_value = "first-date")]
        interaction: String,

        /// Write the finished scan as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score a list of ratings without a session
    Score {
        /// Comma-separated ratings (e.g. "good,neutral,red-flag")
        #[arg(long)]
        ratings: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two saved scans
    Compare {
        /// Baseline scan JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current scan JSON
        #[arg(long)]
        current: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// List the categories of a question bank
    Categories {
        /// Path to bank file
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and example question bank
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("matchscan=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan { plan, format } => commands::plan::execute(plan, format),
        Commands::Simulate {
            plan,
            answers,
            subject,
            interaction,
            output,
        } => commands::simulate::execute(plan, answers, subject, interaction, output),
        Commands::Score { ratings, config } => commands::score::execute(ratings, config),
        Commands::Compare {
            baseline,
            current,
            format,
            config,
        } => commands::compare::execute(baseline, current, format, config),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Categories { bank } => commands::categories::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
