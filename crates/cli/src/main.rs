//! smithygen CLI
//!
//! Command-line interface for generating Rust SDK clients from Smithy
//! 2.0 JSON AST service models.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use smithygen_codegen::{Hooks, SmithyOptions, SmithyTask};
use smithygen_common::{IssuesBag, Policies, Policy};
use smithygen_model::{parse_model, ParseOptions, SymbolsProvider, TraitRegistry};

#[derive(Parser)]
#[command(name = "smithygen")]
#[command(version, about = "Generate Rust SDK clients from Smithy 2.0 models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a single model file and display the projected service
    #[command(after_help = "EXAMPLES:\n  \
        # Inspect a service model\n  \
        smithygen parse --model models/tables.json")]
    Parse {
        /// Path to the Smithy JSON AST file
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Generate clients for every model in a directory
    #[command(after_help = "EXAMPLES:\n  \
        # Generate all services under ./models into ./sdk\n  \
        smithygen generate --src ./models --out ./sdk\n\n  \
        # Keep going past broken service files\n  \
        smithygen generate --src ./models --out ./sdk --on-error skip")]
    Generate {
        /// Directory containing *.json service models
        #[arg(short, long)]
        src: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        out: PathBuf,

        /// What to do when a service file fails
        #[arg(long, value_enum, default_value_t = FailureMode::Skip)]
        on_error: FailureMode,

        /// What to do with unknown traits
        #[arg(long, value_enum, default_value_t = FailureMode::Skip)]
        on_unknown_trait: FailureMode,

        /// What to do with unknown model properties
        #[arg(long, value_enum, default_value_t = FailureMode::Abort)]
        on_unknown_property: FailureMode,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailureMode {
    /// Record an issue and continue
    Skip,
    /// Stop the run
    Abort,
}

impl From<FailureMode> for Policy {
    fn from(mode: FailureMode) -> Policy {
        match mode {
            FailureMode::Skip => Policy::Skip,
            FailureMode::Abort => Policy::Abort,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Parse { model } => run_parse(&model),
        Commands::Generate {
            src,
            out,
            on_error,
            on_unknown_trait,
            on_unknown_property,
        } => run_generate(src, out, on_error, on_unknown_trait, on_unknown_property),
    }
}

fn run_parse(path: &PathBuf) -> Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read model file {}", path.display()))?;
    let registry = TraitRegistry::builtin();
    let opts = ParseOptions {
        registry: &registry,
        policy: Policies::default().parse,
    };
    let mut issues = IssuesBag::new();
    let model = parse_model(&data, &opts, &mut issues)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let symbols = SymbolsProvider::consume(model).context("failed to project service")?;

    println!(
        "{} {}",
        "Service:".bold(),
        symbols.local_name(symbols.service_id())?.green()
    );
    println!("{} {}", "Operations:".bold(), symbols.operations().len());
    for op in symbols.operations() {
        println!("  - {}", symbols.local_name(*op)?);
    }
    println!("{} {}", "Data shapes:".bold(), symbols.data_shapes().len());
    println!("{} {}", "Errors:".bold(), symbols.errors().len());
    for error in symbols.errors() {
        println!("  - {}", symbols.local_name(*error)?.red());
    }
    if !symbols.auth_schemes().is_empty() {
        println!(
            "{} {}",
            "Auth schemes:".bold(),
            symbols.auth_schemes().join(", ")
        );
    }
    report_issues(issues.entries());
    Ok(())
}

fn run_generate(
    src: PathBuf,
    out: PathBuf,
    on_error: FailureMode,
    on_unknown_trait: FailureMode,
    on_unknown_property: FailureMode,
) -> Result<()> {
    let mut policies = Policies::default();
    policies.service.process = on_error.into();
    policies.parse.traits = on_unknown_trait.into();
    policies.parse.property = on_unknown_property.into();

    let options = SmithyOptions {
        src_dir: src.clone(),
        out_dir: out.clone(),
        policies,
    };
    let summary = SmithyTask::run(&options, &Hooks::new())
        .with_context(|| format!("generation failed for {}", src.display()))?;

    println!(
        "{} {} service(s) into {}",
        "Generated".green().bold(),
        summary.services.len(),
        out.display()
    );
    for (slug, files) in &summary.files {
        println!("  {} ({} files)", slug.bold(), files.len());
    }
    report_issues(&summary.issues);
    Ok(())
}

fn report_issues(issues: &[smithygen_common::Issue]) {
    if issues.is_empty() {
        return;
    }
    println!("{}", format!("{} issue(s):", issues.len()).yellow().bold());
    for issue in issues {
        println!("  {} {}", "!".yellow(), issue);
    }
}
