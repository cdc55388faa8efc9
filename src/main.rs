use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use tracing_subscriber::EnvFilter;
use workout_tables::Workout;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Print the laps and track points of a GPX or TCX workout file as tables",
    long_about = None
)]
struct Cli {
    /// GPX or TCX file to read
    #[arg(value_hint = ValueHint::FilePath)]
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let workout = Workout::read(&cli.path)
        .with_context(|| format!("failed to extract workout data from {}", cli.path.display()))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{workout}").context("failed to write tables to stdout")?;
    Ok(())
}
