//! ORB CLI: drive the breakout engine over recorded or synthetic bars.
//!
//! Commands:
//! - `replay`: feed a CSV of one-minute bars through the engine and a paper broker
//! - `demo`: same loop over a seeded random walk
//! - `config`: print the default configuration for a symbol as TOML
//!
//! Every non-quiet evaluation is printed as one JSON line on stdout; logs
//! go to stderr and honor `RUST_LOG`.

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use orb_core::broker::{BarHistory, ClosedTrade, MarketSnapshot, PaperBroker};
use orb_core::domain::Bar;
use orb_core::indicators::Atr;
use orb_core::synthetic::{random_walk_bars, SyntheticConfig};
use orb_core::{EngineConfig, EngineError, Evaluation, SessionEngine, SessionState};

#[derive(Parser)]
#[command(name = "orb", about = "Opening-range breakout engine, replay and demo driver")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "orb_core=debug").
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV of completed bars (time,open,high,low,close).
    Replay {
        /// Path to a TOML engine config.
        #[arg(long)]
        config: PathBuf,

        /// Path to the bar CSV, oldest first.
        #[arg(long)]
        bars: PathBuf,

        #[command(flatten)]
        account: AccountArgs,
    },
    /// Run the engine over a seeded synthetic random walk.
    Demo {
        /// RNG seed.
        #[arg(long, default_value_t = 7)]
        seed: u64,

        /// Calendar days of one-minute bars to generate.
        #[arg(long, default_value_t = 5)]
        days: u32,

        /// First generated day (YYYY-MM-DD).
        #[arg(long, default_value = "2024-03-04")]
        start: String,

        /// Optional TOML engine config. Defaults to an index CFD preset.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        account: AccountArgs,
    },
    /// Print the default configuration for a symbol.
    Config {
        #[arg(long, default_value = "US30")]
        symbol: String,
    },
}

#[derive(clap::Args, Clone, Copy)]
struct AccountArgs {
    /// Starting paper equity.
    #[arg(long, default_value_t = 10_000.0)]
    equity: f64,

    /// Quoted spread in price units. Defaults to two points.
    #[arg(long)]
    spread: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Replay { config, bars, account } => run_replay(&config, &bars, account),
        Commands::Demo { seed, days, start, config, account } => {
            run_demo(seed, days, &start, config.as_deref(), account)
        }
        Commands::Config { symbol } => {
            let config = EngineConfig::for_symbol(symbol);
            config.validate()?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_replay(config_path: &Path, bars_path: &Path, account: AccountArgs) -> Result<()> {
    let config = EngineConfig::from_toml_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let bars = read_bars(bars_path)?;
    if bars.is_empty() {
        bail!("no bars in {}", bars_path.display());
    }
    info!(bars = bars.len(), path = %bars_path.display(), "replaying");
    drive(config, &bars, account)
}

fn run_demo(
    seed: u64,
    days: u32,
    start: &str,
    config_path: Option<&Path>,
    account: AccountArgs,
) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}'"))?;
    let config = match config_path {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => demo_config(),
    };

    let minutes = days as usize * 24 * 60;
    let first = start_date.and_hms_opt(0, 0, 0).context("invalid start time")?;
    let synthetic = SyntheticConfig::new(first, minutes);
    let bars = random_walk_bars(&synthetic, seed);
    info!(seed, days, bars = bars.len(), "generated synthetic session data");
    drive(config, &bars, account)
}

fn demo_config() -> EngineConfig {
    let mut config = EngineConfig::for_symbol("US30");
    config.instrument.point = 0.01;
    config.instrument.lot_step = 0.01;
    config.breakout.min_angle_degrees = 0.0;
    config
}

/// One JSON line per reported evaluation.
#[derive(Serialize)]
struct EvaluationLine<'a> {
    time: NaiveDateTime,
    #[serde(flatten)]
    evaluation: &'a Evaluation,
}

#[derive(Serialize)]
struct TradeLine<'a> {
    event: &'static str,
    #[serde(flatten)]
    trade: &'a ClosedTrade,
}

#[derive(Serialize)]
struct Summary {
    event: &'static str,
    bars: usize,
    trades: usize,
    winners: usize,
    net_pnl: f64,
    final_state: SessionState,
}

/// Feed each bar as completed one minute after its open, quoting its close.
fn drive(config: EngineConfig, bars: &[Bar], account: AccountArgs) -> Result<()> {
    let spread = account.spread.unwrap_or(2.0 * config.instrument.point());
    if !(spread.is_finite() && spread >= 0.0) {
        bail!("--spread must be a non-negative number, got {spread}");
    }
    let half_spread = spread / 2.0;

    let mut atr = Atr::new(config.volatility.atr_period);
    let mut history = BarHistory::new();
    let mut broker =
        PaperBroker::new(account.equity).with_min_stop_distance(config.instrument.min_stop_distance);
    let mut engine = SessionEngine::orb(config)?;

    let mut last_state = engine.state();
    for bar in bars {
        history.push(*bar);
        let volatility = atr.update(bar);

        let now = bar.time + Duration::minutes(1);
        let (bid, ask) = (bar.close - half_spread, bar.close + half_spread);
        for trade in broker.set_quote(now, bid, ask) {
            emit(&TradeLine { event: "closed", trade: &trade })?;
        }

        let mut snapshot = MarketSnapshot::new(bid, ask);
        if let Some(value) = volatility {
            snapshot = snapshot.with_volatility(value);
        }

        let evaluation = match engine.evaluate(now, &snapshot, &history, &mut broker) {
            Ok(evaluation) => evaluation,
            Err(EngineError::Sizing(e)) => {
                warn!(%now, error = %e, "order not sized, skipping");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if !evaluation.is_quiet() || evaluation.state != last_state {
            emit(&EvaluationLine { time: now, evaluation: &evaluation })?;
        }
        last_state = evaluation.state;
    }

    let trades = broker.closed_trades();
    emit(&Summary {
        event: "summary",
        bars: bars.len(),
        trades: trades.len(),
        winners: trades.iter().filter(|t| t.pnl > 0.0).count(),
        net_pnl: trades.iter().map(|t| t.pnl).sum(),
        final_state: engine.state(),
    })
}

fn emit<T: Serialize>(line: &T) -> Result<()> {
    println!("{}", serde_json::to_string(line)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

const TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

fn parse_time(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(t);
        }
    }
    bail!("unrecognized bar time '{raw}'")
}

fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvBar>().enumerate() {
        let row = row.with_context(|| format!("{} row {}", path.display(), i + 1))?;
        let time = parse_time(&row.time).with_context(|| format!("row {}", i + 1))?;
        let bar = Bar::new(time, row.open, row.high, row.low, row.close);
        if let Some(prev) = bars.last().map(|b: &Bar| b.time) {
            if time <= prev {
                bail!("bars out of order at row {} ({time} after {prev})", i + 1);
            }
        }
        bars.push(bar);
    }
    Ok(bars)
}
