use clap::Parser;
use gym_maint::cli::{self, CommonArgs};

/// Repair malformed member rows in place
#[derive(Parser)]
#[command(name = "clean-database")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, _guard) = cli::setup(&args.common, None)?;
    cli::run_clean(&config)?;
    println!("🔄 Now regenerate the ORM client if the application needs it");
    Ok(())
}
