use clap::Parser;
use gym_maint::cli::{self, CommonArgs};

/// Deactivate members whose subscription has expired
#[derive(Parser)]
#[command(name = "expire-members")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, _guard) = cli::setup(&args.common, None)?;
    cli::run_expire(&config)
}
