use clap::Parser;
use gym_maint::cli::{self, CommonArgs, DiagnoseArgs};

/// Scan the member table for corrupt rows without changing anything
#[derive(Parser)]
#[command(name = "diagnose-database")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    diagnose: DiagnoseArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, _guard) = cli::setup(&args.common, None)?;
    cli::run_diagnose(&config, &args.diagnose)
}
