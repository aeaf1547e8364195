//! Loyalty POS CLI - Database migrations and merchant management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! loyalty migrate
//!
//! # Create or update a merchant and its rewards tiers
//! loyalty merchant seed --file merchant.yaml
//!
//! # Check which tier a spend total reaches, without a database
//! loyalty tiers resolve --file merchant.yaml --spent 110
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `merchant seed` - Upsert a merchant from YAML
//! - `tiers resolve` - Resolve a tier offline

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "loyalty")]
#[command(author, version, about = "Loyalty POS CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage merchants
    Merchant {
        #[command(subcommand)]
        action: MerchantAction,
    },
    /// Inspect rewards tiers
    Tiers {
        #[command(subcommand)]
        action: TiersAction,
    },
}

#[derive(Subcommand)]
enum MerchantAction {
    /// Create or update a merchant and its rewards configuration
    Seed {
        /// Merchant YAML file
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum TiersAction {
    /// Show the tier a spend total qualifies for
    Resolve {
        /// Merchant YAML file
        #[arg(short, long)]
        file: PathBuf,

        /// Cumulative spend
        #[arg(short, long)]
        spent: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Merchant { action } => match action {
            MerchantAction::Seed { file } => commands::merchant::seed(&file).await?,
        },
        Commands::Tiers { action } => match action {
            TiersAction::Resolve { file, spent } => {
                let report = commands::tiers::resolve(&file, &spent)?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{report}");
                }
            }
        },
    }
    Ok(())
}
