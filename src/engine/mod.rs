//! Core backtest engine.
//!
//! This module provides the types a backtest is made of:
//! - `Run`: replays quotes against a strategy and keeps the books.
//! - `Position`: the single trade a run may hold.
//! - `Wallet`: cash and the stop-loss reserve.
//! - `Quote`: one price observation.
//! - `RunIdentity`: account and strategy a run belongs to.

mod identity;
mod position;
mod quote;
mod wallet;

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    config::RunConfig,
    errors::{Error, Result},
    report::{Report, ReportId, ReportSink},
    statistics::{DrawdownReturnPolicy, Statistics, StatisticsEngine},
};

pub use identity::*;
pub use position::*;
pub use quote::*;
pub use wallet::*;

#[cfg(test)]
mod scenarios;

/// What to do with a position still open when the window ends.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowEndPolicy {
    /// Report the position as open, with its reserve still held.
    #[default]
    LeaveOpen,
    /// Close it at the price of the quote that ended the window.
    CloseAtQuote,
}

/// Lifecycle of a run. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Quotes are handed to the strategy.
    Active,
    /// The window was exceeded and the report emitted.
    Finished,
}

/// Decision logic consulted on every quote inside the window.
///
/// The strategy gets the run itself and may call [`Run::open_position`] and
/// [`Run::close_position`] any number of times. Any error it returns is passed
/// to the driver as is.
pub trait Strategy {
    /// Reacts to `quote`.
    fn execute(&mut self, quote: &Quote, run: &mut Run) -> Result<()>;
}

impl<F> Strategy for F
where
    F: FnMut(&Quote, &mut Run) -> Result<()>,
{
    fn execute(&mut self, quote: &Quote, run: &mut Run) -> Result<()> {
        self(quote, run)
    }
}

/// One backtest: a cash ledger, at most one open position and running
/// statistics, driven quote by quote until the time window is exceeded.
pub struct Run {
    identity: RunIdentity,
    asset: String,
    window: (DateTime<Utc>, DateTime<Utc>),
    position_size_cap: f64,
    window_end_policy: WindowEndPolicy,
    wallet: Wallet,
    position: Position,
    stats: StatisticsEngine,
    state: RunState,
    last_quote_at: Option<DateTime<Utc>>,
    report_id: ReportId,
    report: Option<Report>,
    sink: Box<dyn ReportSink + Send>,
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("identity", &self.identity)
            .field("asset", &self.asset)
            .field("window", &self.window)
            .field("wallet", &self.wallet)
            .field("position", &self.position)
            .field("state", &self.state)
            .field("report_id", &self.report_id)
            .finish_non_exhaustive()
    }
}

impl Run {
    /// Creates a new run.
    ///
    /// ### Arguments
    /// * `config` - A validated configuration, see [`RunConfig::validate`].
    /// * `report_id` - Correlation id echoed in the terminal report.
    /// * `sink` - Receives the terminal report, once.
    pub fn new<K>(config: &RunConfig, report_id: ReportId, sink: K) -> Self
    where
        K: ReportSink + Send + 'static,
    {
        Self {
            identity: config.identity(),
            asset: config.asset.clone(),
            window: (config.window_start, config.window_end),
            position_size_cap: config.position_size_cap,
            window_end_policy: config.window_end_policy,
            wallet: Wallet::new(config.initial_funds),
            position: Position::new(),
            stats: StatisticsEngine::new(config.initial_funds).with_breakeven(config.breakeven),
            state: RunState::Active,
            last_quote_at: None,
            report_id,
            report: None,
            sink: Box::new(sink),
        }
    }

    /// Replaces the policy computing the drawdown-adjusted return.
    pub fn with_drawdown_return_policy(mut self, policy: Arc<dyn DrawdownReturnPolicy>) -> Self {
        self.stats = self.stats.with_policy(policy);
        self
    }

    /// Returns the account and strategy the run belongs to.
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the traded asset.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Returns the `(start, end)` time window.
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.window
    }

    /// Returns the correlation id the report will carry.
    pub fn report_id(&self) -> ReportId {
        self.report_id
    }

    /// Returns the spendable cash.
    pub fn cash(&self) -> f64 {
        self.wallet.cash()
    }

    /// Returns the stop-loss reserve of the open position, `0.0` without one.
    pub fn reserved_funds(&self) -> f64 {
        self.wallet.reserved()
    }

    /// Returns `true` while a position is open.
    pub fn is_position_open(&self) -> bool {
        self.position.is_open()
    }

    /// Returns the current or last position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns a snapshot of the statistics.
    pub fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns `true` once the window has been exceeded.
    pub fn is_finished(&self) -> bool {
        self.state == RunState::Finished
    }

    /// Returns the terminal report once the run has finished.
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Feeds one quote to the run.
    ///
    /// A quote past the window end finishes the run and emits the report.
    /// Any other quote is handed to `strategy`.
    ///
    /// ### Returns
    /// The state after the quote, or an error. Advancing a finished run or
    /// going back in time fails without touching anything.
    pub fn advance<S>(&mut self, quote: &Quote, strategy: &mut S) -> Result<RunState>
    where
        S: Strategy + ?Sized,
    {
        if self.is_finished() {
            warn!(run = %self.identity, "quote received after the run finished");
            return Err(Error::InvalidState("run is finished"));
        }

        let timestamp = quote.timestamp();
        if let Some(previous) = self.last_quote_at {
            if timestamp < previous {
                return Err(Error::QuoteOutOfOrder {
                    previous,
                    current: timestamp,
                });
            }
        }
        self.last_quote_at = Some(timestamp);

        if timestamp > self.window.1 {
            self.finish(quote)?;
        } else {
            strategy.execute(quote, self)?;
        }

        Ok(self.state)
    }

    /// Runs the backtest over `quotes` until they run out or the window ends.
    ///
    /// ### Returns
    /// The final state, or the first error.
    pub fn run<I, S>(&mut self, quotes: I, strategy: &mut S) -> Result<RunState>
    where
        I: IntoIterator<Item = Quote>,
        S: Strategy + ?Sized,
    {
        for quote in quotes {
            if self.advance(&quote, strategy)? == RunState::Finished {
                break;
            }
        }

        Ok(self.state)
    }

    /// Opens a position at `entry_price`, keeping `stop_loss_reserve` aside.
    ///
    /// The position commits `min(position_size_cap, cash - stop_loss_reserve)`.
    /// When the cash does not cover the reserve, the request is declined and
    /// nothing changes.
    ///
    /// Checks run in this order, all before any mutation: the run must be
    /// active, the reserve and price must be valid, and no position may be
    /// open. Only then is the funds check made, so opening a second position
    /// is always `InvalidState`, whatever reserve it asks for.
    pub fn open_position(&mut self, entry_price: f64, stop_loss_reserve: f64) -> Result<()> {
        self.ensure_active()?;
        if stop_loss_reserve < 0.0 || !stop_loss_reserve.is_finite() {
            return Err(Error::InvalidAmount(stop_loss_reserve));
        }
        if entry_price <= 0.0 || !entry_price.is_finite() {
            return Err(Error::InvalidPrice(entry_price));
        }
        if self.position.is_open() {
            return Err(Error::InvalidState("position is already open"));
        }

        let Some(invested) = self.wallet.investable(stop_loss_reserve, self.position_size_cap) else {
            debug!(
                run = %self.identity,
                stop_loss_reserve,
                cash = self.wallet.cash(),
                "open declined: insufficient funds"
            );
            return Ok(());
        };

        self.position.open(entry_price, invested)?;
        self.wallet.commit(invested, stop_loss_reserve);
        self.stats.on_open(invested);

        debug!(
            run = %self.identity,
            entry_price,
            invested,
            stop_loss_reserve,
            cash = self.wallet.cash(),
            "position opened"
        );
        Ok(())
    }

    /// Closes the open position at `exit_price`.
    ///
    /// ### Returns
    /// The proceeds of the position, or an error if none is open.
    pub fn close_position(&mut self, exit_price: f64) -> Result<f64> {
        self.ensure_active()?;
        let proceeds = self.position.close(exit_price)?;
        self.wallet.settle(proceeds);
        self.stats.on_close(proceeds);

        debug!(
            run = %self.identity,
            exit_price,
            proceeds,
            cash = self.wallet.cash(),
            "position closed"
        );
        Ok(proceeds)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_finished() {
            return Err(Error::InvalidState("run is finished"));
        }
        Ok(())
    }

    /// Moves the run to `Finished` and hands the report to the sink.
    fn finish(&mut self, quote: &Quote) -> Result<()> {
        if self.window_end_policy == WindowEndPolicy::CloseAtQuote && self.position.is_open() {
            self.close_position(quote.price())?;
        }

        self.state = RunState::Finished;
        let report = Report {
            id: self.report_id,
            identity: self.identity.clone(),
            statistics: self.stats.snapshot(),
            cash: self.wallet.cash(),
            reserved: self.wallet.reserved(),
            position_open: self.position.is_open(),
            position_value: self.position.estimate_value(quote.price()),
            finished_at: quote.timestamp(),
        };
        self.report = Some(report.clone());

        info!(
            run = %self.identity,
            report = %self.report_id,
            cash = report.cash,
            funds = report.statistics.current_funds(),
            position_open = report.position_open,
            "run finished"
        );
        self.sink.submit(report)
    }
}
