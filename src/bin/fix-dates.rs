use clap::Parser;
use gym_maint::cli::{self, CommonArgs};

/// Append time-of-day suffixes to date-only member timestamps
#[derive(Parser)]
#[command(name = "fix-dates")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, _guard) = cli::setup(&args.common, None)?;
    cli::run_fix_dates(&config)?;
    println!("💡 Restart the application to pick up the new values");
    Ok(())
}
