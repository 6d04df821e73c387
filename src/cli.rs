//! Shared command-line plumbing for the `gym_maint` binary and the
//! single-purpose tools under `src/bin`.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::clean::clean;
use crate::config::Config;
use crate::db::Database;
use crate::diagnose::{diagnose, DiagnoseOptions};
use crate::expire::expire_members;
use crate::fix_dates::fix_dates;
use crate::import::{import_members, load_sheet, ImportOptions};
use crate::logging::init_logging;

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to a TOML config file (default: gym_maint.toml if present)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides the config file and GYM_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DiagnoseArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// Spreadsheet to import; overrides the config file and GYM_INPUT_PATH
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Prepare the import and report it without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Load configuration and start logging. Keep the guard alive until exit.
pub fn setup(
    common: &CommonArgs,
    input: Option<PathBuf>,
) -> Result<(Config, Option<WorkerGuard>)> {
    dotenv::dotenv().ok();
    let config = Config::load(common.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(common.db.clone(), input);
    let guard = init_logging(&config.logging);
    info!(db = %config.db_path.display(), "Configuration loaded");
    Ok((config, guard))
}

pub fn run_diagnose(config: &Config, args: &DiagnoseArgs) -> Result<()> {
    let db = Database::open_read_only(&config.db_path)?;
    let report = diagnose(db.conn(), &DiagnoseOptions::from(&config.diagnose))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

pub fn run_clean(config: &Config) -> Result<()> {
    println!("🧹 Cleaning database {}...", config.db_path.display());
    let mut db = Database::open(&config.db_path)?;
    let report = clean(db.conn_mut(), Local::now().naive_local())?;
    println!("{report}");
    println!("\n✅ Database cleaned successfully!");
    Ok(())
}

pub fn run_fix_dates(config: &Config) -> Result<()> {
    println!("📅 Fixing date formats in {}...", config.db_path.display());
    let mut db = Database::open(&config.db_path)?;
    let report = fix_dates(db.conn_mut())?;
    println!("{report}");
    println!("\n✅ Date formats fixed successfully!");
    Ok(())
}

pub fn run_expire(config: &Config) -> Result<()> {
    println!("🔄 Updating expired members in {}...", config.db_path.display());
    let mut db = Database::open(&config.db_path)?;
    let report = expire_members(db.conn_mut(), Local::now().date_naive())?;
    println!("{report}");
    Ok(())
}

pub fn run_import(config: &Config, args: &ImportArgs) -> Result<()> {
    let sheet = load_sheet(&config.input_path)
        .with_context(|| format!("Failed to read {}", config.input_path.display()))?;
    let mut db = Database::open(&config.db_path)?;

    if !args.dry_run && !args.yes {
        println!("⚠️  WARNING: This will delete ALL members, their receipts and all invitations");
        println!(
            "   in {} before importing {}.",
            config.db_path.display(),
            config.input_path.display()
        );
        if !confirm("Press Enter to continue or Ctrl+C to cancel...")? {
            println!("❌ Import cancelled");
            return Ok(());
        }
    }

    let options = ImportOptions {
        now: Local::now().naive_local(),
        expected_headers: config.import.expected_headers.clone(),
        dry_run: args.dry_run,
    };
    let report = import_members(db.conn_mut(), &sheet, &options)?;
    println!("{report}");
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    println!("{prompt}");
    io::stdout().flush()?;
    read_confirmation(&mut io::stdin().lock())
}

/// An empty line or "y"/"yes" confirms. End of input cancels, so a
/// non-interactive run never proceeds without `--yes`.
fn read_confirmation<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        return Ok(false);
    }
    let answer = input.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}
