use clap::{Parser, Subcommand};
use tracing::error;

use gym_maint::cli::{self, CommonArgs, DiagnoseArgs, ImportArgs};

#[derive(Parser)]
#[command(name = "gym_maint")]
#[command(about = "Maintenance tools for the gym membership database")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the member table for corrupt rows (read-only)
    Diagnose(DiagnoseArgs),
    /// Repair phones, dates, numeric fields and names; delete rows with bad IDs
    Clean,
    /// Append a time of day to date-only timestamps
    FixDates,
    /// Replace all members with the rows of a spreadsheet
    Import(ImportArgs),
    /// Mark members whose expiry date has passed as inactive
    Expire,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let input = match &cli.command {
        Commands::Import(args) => args.input.clone(),
        _ => None,
    };
    let (config, _guard) = cli::setup(&cli.common, input)?;

    let result = match &cli.command {
        Commands::Diagnose(args) => cli::run_diagnose(&config, args),
        Commands::Clean => cli::run_clean(&config),
        Commands::FixDates => cli::run_fix_dates(&config),
        Commands::Import(args) => cli::run_import(&config, args),
        Commands::Expire => cli::run_expire(&config),
    };

    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }
    result
}
