use clap::Parser;
use gym_maint::cli::{self, CommonArgs, ImportArgs};

/// Reload the member table from a spreadsheet
#[derive(Parser)]
#[command(name = "import-members")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    import: ImportArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, _guard) = cli::setup(&args.common, args.import.input.clone())?;
    println!("🔹 Starting member import...");
    cli::run_import(&config, &args.import)?;
    println!("🔒 Done.");
    Ok(())
}
