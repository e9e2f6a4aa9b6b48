//! Replay driver
//!
//! Feeds historical (CSV) or synthetic bars through the engine tick by
//! tick against the simulated venue, marks equity to closed trades and
//! prints a run summary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use profile_trader::config::EngineConfig;
use profile_trader::orchestrator::Orchestrator;
use profile_trader::ports::AccountInfoProvider;
use profile_trader::sim::{SimAccount, SimCalendar, SimExecution, SimMarketData, StaticSpecs};
use profile_trader::types::{Bar, InstrumentSpec, Quote, Timeframe};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Engine config JSON file (library defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV bar file with open_time,open,high,low,close,volume rows;
    /// synthetic bars are generated when omitted
    #[arg(short, long)]
    bars: Option<PathBuf>,

    /// Symbol to replay
    #[arg(short, long, default_value = "EURUSD")]
    symbol: String,

    /// Starting account equity
    #[arg(short, long, default_value = "10000.0")]
    equity: f64,

    /// Bid/ask spread applied around bar closes
    #[arg(long, default_value = "0.0001")]
    spread: f64,

    /// RNG seed for synthetic bars
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Number of synthetic bars
    #[arg(long, default_value = "2000")]
    count: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("profile_trader=info".parse().unwrap())
                .add_directive("replay=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&raw).context("parsing engine config")?
        }
        None => EngineConfig::default(),
    };
    config.instruments = vec![args.symbol.clone()];

    let bars = match &args.bars {
        Some(path) => load_bars(path)?,
        None => synthetic_bars(args.seed, args.count, config.timeframe),
    };
    let first = bars.first().context("no bars to replay")?;
    info!(
        "Replaying {} {} bars for {} from {}",
        bars.len(),
        config.timeframe,
        args.symbol,
        first.open_time
    );

    let market = Rc::new(SimMarketData::new());
    let account = Rc::new(SimAccount::new(args.equity));
    let specs = Rc::new(StaticSpecs::new());
    let execution = Rc::new(SimExecution::new());
    let calendar = Rc::new(SimCalendar::new());

    let spec = fx_spec();
    specs.insert(&args.symbol, spec);

    // Prior-day aggregates feed the ADR lookback
    for daily in aggregate_daily(&bars) {
        market.push_bar(&args.symbol, Timeframe::D1, daily);
    }

    let mut orchestrator = Orchestrator::new(
        config.clone(),
        first.open_time,
        Box::new(market.clone()),
        Box::new(account.clone()),
        Box::new(specs.clone()),
        Box::new(execution.clone()),
        Box::new(calendar.clone()),
    );

    for bar in &bars {
        market.push_bar(&args.symbol, config.timeframe, bar.clone());

        let quote = Quote {
            time: bar.open_time + config.timeframe.duration(),
            bid: bar.close - args.spread / 2.0,
            ask: bar.close + args.spread / 2.0,
        };
        market.set_quote(&args.symbol, quote);
        execution.apply_quote(&args.symbol, &quote);

        // Mark equity to the trades the venue has closed so far
        let realized: f64 = execution
            .closed_trades()
            .iter()
            .map(|t| t.pnl / spec.price_increment * spec.increment_value * t.size)
            .sum();
        account.set_equity(args.equity + realized);

        orchestrator.on_price_update(bar.open_time + config.timeframe.duration());
    }

    print_summary(&args, &execution, &account);
    Ok(())
}

fn fx_spec() -> InstrumentSpec {
    InstrumentSpec {
        price_increment: 0.0001,
        price_precision: 4,
        increment_value: 1.0,
        size_step: 0.01,
        min_size: 0.01,
        max_size: 100.0,
        min_stop_distance: 0.0005,
    }
}

fn load_bars(path: &PathBuf) -> Result<Vec<Bar>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for row in reader.deserialize() {
        let bar: Bar = row.context("parsing bar row")?;
        bars.push(bar);
    }
    bars.sort_by_key(|b| b.open_time);
    Ok(bars)
}

/// Seeded random-walk bars starting Monday 2024-01-01 00:00 UTC
fn synthetic_bars(seed: u64, count: usize, timeframe: Timeframe) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut price = 1.1000;

    (0..count)
        .map(|i| {
            let open = price;
            let drift: f64 = rng.gen_range(-0.0008..0.0010);
            let close = open + drift;
            let high = open.max(close) + rng.gen_range(0.0..0.0004);
            let low = open.min(close) - rng.gen_range(0.0..0.0004);
            let volume = rng.gen_range(50..500);
            price = close;
            Bar {
                open_time: start + timeframe.duration() * i as i32,
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect()
}

/// Collapse intraday bars into one daily bar per calendar date
fn aggregate_daily(bars: &[Bar]) -> Vec<Bar> {
    let mut days: BTreeMap<NaiveDate, Bar> = BTreeMap::new();
    for bar in bars {
        let date = bar.open_time.date_naive();
        days.entry(date)
            .and_modify(|daily| {
                daily.high = daily.high.max(bar.high);
                daily.low = daily.low.min(bar.low);
                daily.close = bar.close;
                daily.volume += bar.volume;
            })
            .or_insert_with(|| Bar {
                open_time: Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            });
    }
    days.into_values().collect()
}

fn print_summary(args: &Args, execution: &SimExecution, account: &SimAccount) {
    let trades = execution.closed_trades();
    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    let losses = trades.iter().filter(|t| t.pnl < 0.0).count();
    let net_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let win_rate = if trades.is_empty() {
        0.0
    } else {
        wins as f64 / trades.len() as f64 * 100.0
    };
    let final_equity = account.equity().unwrap_or(args.equity);

    info!("==== Replay summary ====");
    info!(
        "Trades: {} | Wins: {} | Losses: {} | WR: {:.1}%",
        trades.len(),
        wins,
        losses,
        win_rate
    );
    info!(
        "Net P&L: {:+.5} price units | Final equity: {:.2}",
        net_pnl, final_equity
    );
    if let Some(open) = execution.open_position_for(&args.symbol) {
        info!(
            "Still open: {} {} @ {:.5} (stop {:.5})",
            open.symbol, open.side, open.open_price, open.stop_loss
        );
    }
}
