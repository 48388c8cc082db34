mod config;
mod error;
mod parser;
mod pipeline;
mod records;
mod rules;
mod sink;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::parser::sections::Normalization;
use crate::rules::{Language, MergePolicy, Preset};

#[derive(Parser)]
#[command(
    name = "hexagram_extract",
    about = "Extract hexagram titles and commentary from a text edition into the JSON record file"
)]
struct Cli {
    /// Settings file (default: ./hexagram_extract.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Source text document
    #[arg(short, long, global = true)]
    document: Option<PathBuf>,

    /// Input record file (JSON object keyed "1".."64")
    #[arg(short, long, global = true)]
    records: Option<PathBuf>,

    /// Output file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Marker set of the source edition
    #[arg(short, long, global = true, value_enum)]
    language: Option<Language>,

    /// Blank-line handling for extracted text
    #[arg(long, global = true, value_enum)]
    normalization: Option<Normalization>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract titles and sections per entry and merge them into the records
    Merge {
        /// Which fields to update (ignored when the config file lists rules)
        #[arg(short, long, value_enum)]
        preset: Option<Preset>,
    },
    /// Extract the top-line commentary and merge it into lines["6"] by position
    Line6 {
        /// Overwrite even with empty paragraphs, or only with non-empty ones
        #[arg(long, value_enum)]
        policy: Option<MergePolicy>,
    },
    /// Dump the top-line commentary paragraphs to a text file
    Excerpts,
    /// Rewrite every string in the record file without blank lines
    Flatten {
        #[arg(long, value_enum, default_value = "single-newline")]
        mode: Normalization,
    },
    /// Show what the document parses into, without writing anything
    Stats {
        #[arg(short, long, value_enum)]
        preset: Option<Preset>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "70")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.document.is_some() {
        settings.document = cli.document;
    }
    if cli.records.is_some() {
        settings.records = cli.records;
    }
    if cli.output.is_some() {
        settings.output = cli.output;
    }
    if let Some(language) = cli.language {
        settings.language = language;
    }
    if let Some(normalization) = cli.normalization {
        settings.normalization = normalization;
    }

    match cli.command {
        Commands::Merge { preset } => {
            if let Some(preset) = preset {
                settings.preset = preset;
                settings.rules = None;
            }
            let cfg = settings.resolve();
            let report = pipeline::run_merge(&cfg)?;
            report.print();
        }
        Commands::Line6 { policy } => {
            if policy.is_some() {
                settings.line6_policy = policy;
            }
            let cfg = settings.resolve();
            let report = pipeline::run_line6(&cfg)?;
            report.print();
        }
        Commands::Excerpts => {
            let cfg = settings.resolve();
            let n = pipeline::run_excerpts(&cfg)?;
            println!("Saved {} excerpts to {}", n, cfg.output()?.display());
        }
        Commands::Flatten { mode } => {
            let cfg = settings.resolve();
            let n = pipeline::run_flatten(&cfg, mode)?;
            println!("Cleaned {} strings; saved to {}", n, cfg.output()?.display());
        }
        Commands::Stats { preset, limit } => {
            if let Some(preset) = preset {
                settings.preset = preset;
                settings.rules = None;
            }
            let cfg = settings.resolve();
            let document = pipeline::read_document(cfg.document()?)?;
            print_stats(&pipeline::document_stats(&document, &cfg), limit);
        }
    }

    Ok(())
}

fn print_stats(stats: &pipeline::DocumentStats, limit: usize) {
    println!("Heading lines:   {}", stats.heading_lines);
    println!("Distinct titles: {}", stats.distinct_titles);
    println!("Blocks:          {}", stats.blocks);
    println!("Line-6 units:    {}", stats.line6_units);
    if stats.line6_units != stats.distinct_titles {
        println!("WARNING: line-6 units do not match the number of entries");
    }

    if stats.entries.is_empty() {
        println!("\nNo entries found.");
        return;
    }

    let targets: Vec<&str> = stats.entries[0]
        .sections
        .iter()
        .map(|(t, _)| t.as_str())
        .collect();
    print!("\n{:>3} | {:<40}", "#", "Title");
    for t in &targets {
        print!(" | {:<8}", truncate(t, 8));
    }
    println!();
    println!("{}", "-".repeat(46 + targets.len() * 11));

    for entry in stats.entries.iter().take(limit) {
        print!("{:>3} | {:<40}", entry.ordinal, truncate(&entry.title, 40));
        for (_, found) in &entry.sections {
            print!(" | {:<8}", if *found { "yes" } else { "-" });
        }
        println!();
    }

    if !stats.diagnostics.is_empty() {
        println!("\n--- Diagnostics ---");
        for d in &stats.diagnostics {
            println!("  {}", d);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
