//! # Moving Average Crossover
//!
//! Buys when a fast simple moving average crosses above a slow one and sells
//! on the opposite cross. The replay window ends before the generated data
//! does, so the run finishes on its own.
//!
//! Run with `RUST_LOG=debug` to see every trade.

use strategy_backtest::prelude::*;

use chrono::{DateTime, Duration, Utc};
use ta::{Next, indicators::SimpleMovingAverage};
use tracing_subscriber::EnvFilter;

/// Generates deterministic hourly quotes.
fn generate_sample_quotes(max: i32, seed: i32, base_price: f64) -> Vec<Quote> {
    let start: DateTime<Utc> = DateTime::default();

    (0..=max)
        .map(|i| {
            // Base price with trend (+ 0.05*i)
            let trend = base_price + 0.05 * (i as f64);
            // Price variation using simple trigonometric function with seed
            let variation = 5.0 * ((i as f64 * 0.1 + seed as f64).sin() * 0.5 + 0.5);
            let kind = if i % 2 == 0 { QuoteKind::Buy } else { QuoteKind::Sell };
            Quote::new("GOLD", trend + variation, kind, start + Duration::hours(i as i64))
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let quotes = generate_sample_quotes(3000, 42, 100.0);
    let start = quotes.first().map(Quote::timestamp).unwrap_or_default();
    let config = RunConfig::new(
        "demo",
        "sma-crossover",
        "GOLD",
        (start, start + Duration::hours(2500)),
        1_000.0,
        250.0,
    )?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut run = Run::new(&config, ReportId::random(), tx);

    let mut fast = SimpleMovingAverage::new(10)?;
    let mut slow = SimpleMovingAverage::new(40)?;
    let mut was_above = false;

    let mut strategy = |quote: &Quote, run: &mut Run| -> Result<()> {
        let price = quote.price();
        let above = fast.next(price) > slow.next(price);

        if above && !was_above && !run.is_position_open() {
            // keep 2% of the cash aside as the stop-loss buffer
            let reserve = run.cash() * 0.02;
            run.open_position(price, reserve)?;
        } else if !above && was_above && run.is_position_open() {
            run.close_position(price)?;
        }

        was_above = above;
        Ok(())
    };

    let state = run.run(quotes, &mut strategy)?;
    println!("run {} ended {:?}", run.identity(), state);

    if let Ok(report) = rx.try_recv() {
        println!("report {} (position left open: {})", report.id, report.position_open);
        if let Some(value) = report.position_value {
            println!("open position marked at {value:.2}");
        }
        println!("{}", report.statistics);
    }

    Ok(())
}
