//! Property Investment Advisor CLI
//!
//! Trains the pipelines locally, evaluates properties, and browses market
//! insights and model status through the advisor API.

mod client;
mod commands;
mod config;
mod output;

use advisor_lib::Task;
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{evaluate, insights, models, train};
use tracing_subscriber::EnvFilter;

/// Property Investment Advisor CLI
#[derive(Parser)]
#[command(name = "advisor")]
#[command(author, version, about = "CLI for the Property Investment Advisor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via ADVISOR_API_URL env var)
    #[arg(long, env = "ADVISOR_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format (defaults to the config file, then table)
    #[arg(long, short, value_enum, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train pipelines from the processed dataset
    #[command(subcommand)]
    Train(TrainCommands),

    /// Evaluate a property as an investment
    Evaluate(evaluate::EvaluateArgs),

    /// Market insights over the historical listings
    #[command(subcommand)]
    Insights(InsightsCommands),

    /// Show the pipeline artifacts known to the server
    Models,

    /// Show server health
    Health,
}

#[derive(Subcommand)]
pub enum TrainCommands {
    /// Train the good-investment classifier
    Classifier(train::TrainArgs),

    /// Train the price regressor
    Regressor(train::TrainArgs),

    /// Train both pipelines
    All(train::TrainArgs),
}

#[derive(Subcommand)]
pub enum InsightsCommands {
    /// Show KPIs and breakdowns for the filtered listings
    Show(insights::InsightFilterArgs),

    /// List the values each filter can take
    Filters,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format)?;

    // The client is only built for commands that talk to the server
    let api_url = config.resolve_api_url(cli.api_url);
    let api_client = || client::ApiClient::new(&api_url);

    // Execute command
    match cli.command {
        Commands::Train(train_cmd) => match train_cmd {
            TrainCommands::Classifier(args) => {
                train::train(vec![Task::Classification], args, format).await?;
            }
            TrainCommands::Regressor(args) => {
                train::train(vec![Task::Regression], args, format).await?;
            }
            TrainCommands::All(args) => {
                train::train(Task::ALL.to_vec(), args, format).await?;
            }
        },
        Commands::Evaluate(args) => {
            evaluate::evaluate(&api_url, args, format).await?;
        }
        Commands::Insights(insights_cmd) => match insights_cmd {
            InsightsCommands::Show(args) => {
                insights::show_insights(&api_client()?, args.into(), format).await?;
            }
            InsightsCommands::Filters => {
                insights::show_filters(&api_client()?, format).await?;
            }
        },
        Commands::Models => {
            models::list_models(&api_client()?, format).await?;
        }
        Commands::Health => {
            models::show_health(&api_client()?, format).await?;
        }
    }

    Ok(())
}
