//! swinglab CLI — run a backtest or a parameter sweep over CSV bar data.
//!
//! Commands:
//! - `run` — execute one backtest from a TOML config file
//! - `sweep` — run the optimization grid and write parameter-tagged rows

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use swinglab_runner::{
    format_summary, format_trades, load_bars_csv, run_single_backtest, sweep, write_rows_csv,
    ParamGrid, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "swinglab",
    about = "swinglab CLI — oscillator/mean-reversion backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file with date,open,high,low,close,volume columns.
        #[arg(long)]
        data: PathBuf,

        /// Also print one line per closed trade.
        #[arg(long, default_value_t = false)]
        trades: bool,
    },
    /// Run a parameter sweep and write one tagged row per parameter set.
    Sweep {
        /// Path to the base TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file with date,open,high,low,close,volume columns.
        #[arg(long)]
        data: PathBuf,

        /// Output CSV path for the optimization rows.
        #[arg(long, default_value = "optimization.csv")]
        output: PathBuf,

        /// Comma-separated indicator windows to test (default 10,14,20,30).
        #[arg(long)]
        periods: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data,
            trades,
        } => run_cmd(config, data, trades),
        Commands::Sweep {
            config,
            data,
            output,
            periods,
        } => sweep_cmd(config, data, output, periods),
    }
}

fn run_cmd(config_path: PathBuf, data_path: PathBuf, show_trades: bool) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let bars = load_bars_csv(&data_path, &config.backtest.symbol)?;

    let result = run_single_backtest(&config, &bars)?;

    if show_trades {
        print!("{}", format_trades(&result));
        println!();
    }
    print!("{}", format_summary(&result));
    Ok(())
}

fn sweep_cmd(
    config_path: PathBuf,
    data_path: PathBuf,
    output: PathBuf,
    periods: Option<String>,
) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let bars = load_bars_csv(&data_path, &config.backtest.symbol)?;

    let mut grid = ParamGrid::default_grid();
    if let Some(list) = periods {
        grid.periods = parse_periods(&list)?;
    }

    println!("Sweeping {} parameter sets...", grid.size());
    let rows = sweep(&config, &grid, &bars)?;
    write_rows_csv(&rows, &output)?;

    let best = rows
        .iter()
        .max_by(|a, b| a.ending_value.total_cmp(&b.ending_value));
    if let Some(best) = best {
        println!(
            "Best ending value {:.2} at {:?}",
            best.ending_value, best.params
        );
    }
    println!("Rows written to {}", output.display());
    Ok(())
}

fn parse_periods(list: &str) -> Result<Vec<usize>> {
    let periods: Vec<usize> = list
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()?;
    if periods.is_empty() {
        bail!("--periods needs at least one window length");
    }
    Ok(periods)
}
