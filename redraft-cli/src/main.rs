//! # Redraft CLI
//!
//! Command-line interface for the reflection workflows.
//!
//! Usage:
//!   redraft chart --data <csv> --instruction <text>
//!   redraft sql --db <path> --question <text>
//!   redraft providers
//!
//! Examples:
//!   redraft chart --data coffee_sales.csv --instruction "monthly revenue by coffee type"
//!   redraft sql --db sales.db --seed-demo --question "which color brought in the most revenue?"
//!   redraft sql --db sales.db --question "top product by units" --reflect-model gemini-2.5-pro
//!
//! API keys come from the environment (or a .env file): GEMINI_API_KEY,
//! OPENAI_API_KEY, ANTHROPIC_API_KEY.

use clap::{Parser, Subcommand};
use redraft_core::{Evidence, ExecutionOutcome, ModelSession, ProviderRegistry, SqliteExecutor};
use redraft_workflow::{ChartConfig, ChartWorkflow, SqlConfig, SqlWorkflow, WorkflowResult};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "redraft")]
#[command(author, version, about = "Generate, execute, critique, regenerate")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show full artifacts and outcomes in the final report
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - print only the final artifact
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft plotting code for a CSV dataset, render it, and refine it
    Chart {
        /// CSV dataset to plot from
        #[arg(long)]
        data: PathBuf,

        /// What the chart should show
        #[arg(long)]
        instruction: String,

        /// Basename for the saved images
        #[arg(long, default_value = "chart")]
        basename: String,

        /// Model that drafts the code (default: gemini-2.5-flash-lite)
        #[arg(long)]
        gen_model: Option<String>,

        /// Model that reviews the rendered chart (default: gemini-2.5-flash)
        #[arg(long)]
        reflect_model: Option<String>,

        /// Directory executions are staged under
        #[arg(long, default_value = ".")]
        workdir: PathBuf,

        /// Python interpreter for the sandbox
        #[arg(long)]
        python: Option<String>,
    },
    /// Draft a SQL query for a question, run it, and refine it
    Sql {
        /// SQLite database file (created if missing)
        #[arg(long)]
        db: PathBuf,

        /// The question to answer
        #[arg(long)]
        question: String,

        /// Create and fill the demo transactions table first
        #[arg(long)]
        seed_demo: bool,

        /// Model that drafts the query (default: gemini-2.5-flash-lite)
        #[arg(long)]
        gen_model: Option<String>,

        /// Model that reviews the query (default: gemini-2.5-pro)
        #[arg(long)]
        reflect_model: Option<String>,
    },
    /// List configured providers and their default models
    Providers,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chart {
            data,
            instruction,
            basename,
            gen_model,
            reflect_model,
            workdir,
            python,
        } => {
            let defaults = ChartConfig::default();
            let config = ChartConfig {
                generation_model: gen_model.unwrap_or(defaults.generation_model),
                reflection_model: reflect_model.unwrap_or(defaults.reflection_model),
                basename,
                workdir,
                python,
                verbose: !cli.quiet,
            };
            run_chart(&data, &instruction, config, cli.verbose, cli.quiet).await;
        }
        Commands::Sql {
            db,
            question,
            seed_demo,
            gen_model,
            reflect_model,
        } => {
            let defaults = SqlConfig::default();
            let config = SqlConfig {
                generation_model: gen_model.unwrap_or(defaults.generation_model),
                reflection_model: reflect_model.unwrap_or(defaults.reflection_model),
                verbose: !cli.quiet,
            };
            run_sql(&db, &question, seed_demo, config, cli.verbose, cli.quiet).await;
        }
        Commands::Providers => list_providers(),
    }
}

async fn run_chart(
    data: &PathBuf,
    instruction: &str,
    config: ChartConfig,
    verbose: bool,
    quiet: bool,
) {
    let session = require_session();
    let workflow = ChartWorkflow::with_config(session, config);

    match workflow.run(data, instruction).await {
        Ok(result) => {
            render_result(&result, verbose, quiet);
            finish(&result);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_sql(
    db_path: &PathBuf,
    question: &str,
    seed_demo: bool,
    config: SqlConfig,
    verbose: bool,
    quiet: bool,
) {
    let session = require_session();

    let db = match SqliteExecutor::connect(db_path).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if seed_demo {
        if let Err(e) = db.seed_demo().await {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        if !quiet {
            println!("Seeded demo transactions into {}\n", db_path.display());
        }
    }

    let workflow = SqlWorkflow::with_config(session, config);

    match workflow.run(&db, question).await {
        Ok(result) => {
            render_result(&result, verbose, quiet);
            finish(&result);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Session over the environment's API keys, or a hard stop
fn require_session() -> ModelSession {
    let session = ModelSession::from_env();
    if session.registry().is_empty() {
        eprintln!(
            "No API keys found. Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY."
        );
        std::process::exit(1);
    }
    session
}

fn list_providers() {
    let registry = ProviderRegistry::from_env();
    if registry.is_empty() {
        println!("No providers configured.");
        println!("Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY (a .env file works).");
        return;
    }

    println!("Configured providers:");
    for caller in registry.callers() {
        println!(
            "  - {} [{}]: default model {}, image input: {}",
            caller.name(),
            caller.family(),
            caller.default_model(),
            if caller.supports_images() { "yes" } else { "no" }
        );
    }
}

/// Print whatever the run actually produced
fn render_result(result: &WorkflowResult, verbose: bool, quiet: bool) {
    if quiet {
        if let Some(artifact) = result.final_artifact() {
            println!("{}", artifact.text);
        }
        if let Some(failure) = &result.failure {
            eprintln!("{}", failure);
        }
        return;
    }

    println!("\n--- RESULT ---\n");

    if let Some(artifact) = &result.artifact_v1 {
        println!("v1 artifact:\n{}", artifact.text);
    }
    if let Some(outcome) = &result.outcome_v1 {
        print_outcome("v1", outcome, verbose);
    }
    if let Some(critique) = &result.critique {
        println!("\nFeedback: {}", critique.feedback);
        if critique.is_degraded() {
            println!("(critique parsing degraded; v2 reuses the v1 artifact)");
        }
    }
    if let Some(artifact) = &result.artifact_v2 {
        println!("\nv2 artifact:\n{}", artifact.text);
    }
    if let Some(outcome) = &result.outcome_v2 {
        print_outcome("v2", outcome, verbose);
    }
    if let Some(failure) = &result.failure {
        println!("\nFailed at {}: {}", failure.stage, failure.reason);
        if result.is_partial_success() {
            println!("The v1 results above still stand.");
        }
    }
}

fn print_outcome(label: &str, outcome: &ExecutionOutcome, verbose: bool) {
    println!("\n{} outcome: {}", label, outcome);
    if let Some(Evidence::Table(table)) = outcome.evidence() {
        if verbose || table.len() <= 10 {
            print!("{}", table.to_markdown());
        } else {
            println!("(pass --verbose to print all {} rows)", table.len());
        }
    }
}

/// Exit non-zero unless the run completed or kept its v1 results
fn finish(result: &WorkflowResult) {
    if result.failure.is_some() && !result.is_partial_success() {
        std::process::exit(1);
    }
}
