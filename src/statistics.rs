//! Running performance statistics of a backtest.
//!
//! The [`StatisticsEngine`] consumes two events, a position being opened and a
//! position being closed, and keeps every figure up to date in constant time:
//! - current and peak funds
//! - gross profit / gross loss and win / loss counts
//! - current and longest loss streak
//! - max drawdown, as a fraction of the peak
//! - a drawdown-adjusted return, computed by a pluggable [`DrawdownReturnPolicy`]
//!
//! Nothing here keeps trade history, so closing the thousandth trade costs the
//! same as closing the first.

use std::{fmt, ops::Deref, sync::Arc};

/// How a close that neither gains nor loses is counted.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Breakeven {
    /// Not a win, not a loss. The loss streak is left as is.
    #[default]
    Neutral,
    /// Counted as a win, which also ends the loss streak.
    Win,
}

/// Computes the drawdown-adjusted return after every close.
///
/// `previous` is the value returned by the last call (`0.0` before the first
/// close) and `stats` already reflects the close being processed.
pub trait DrawdownReturnPolicy: fmt::Debug + Send + Sync {
    /// Returns the new drawdown-adjusted return.
    fn evaluate(&self, previous: f64, stats: &Statistics) -> f64;
}

/// Current funds divided by the max drawdown fraction.
///
/// Keeps the previous value while no drawdown has been recorded yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FundsOverMaxDrawdown;

impl DrawdownReturnPolicy for FundsOverMaxDrawdown {
    fn evaluate(&self, previous: f64, stats: &Statistics) -> f64 {
        if stats.max_drawdown > 0.0 {
            stats.current_funds / stats.max_drawdown
        } else {
            previous
        }
    }
}

/// Snapshot of the statistics of a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    initial_funds: f64,
    current_funds: f64,
    peak_funds: f64,
    invested_funds: f64,
    gross_profit: f64,
    gross_loss: f64,
    win_count: u64,
    loss_count: u64,
    current_loss_streak: u64,
    max_loss_streak: u64,
    max_drawdown: f64,
    drawdown_return: f64,
}

impl Statistics {
    fn new(initial_funds: f64) -> Self {
        Self {
            initial_funds,
            current_funds: initial_funds,
            peak_funds: initial_funds,
            invested_funds: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            win_count: 0,
            loss_count: 0,
            current_loss_streak: 0,
            max_loss_streak: 0,
            max_drawdown: 0.0,
            drawdown_return: 0.0,
        }
    }

    /// Returns the funds the run started with.
    pub fn initial_funds(&self) -> f64 {
        self.initial_funds
    }

    /// Returns the funds not tied up in a position.
    pub fn current_funds(&self) -> f64 {
        self.current_funds
    }

    /// Returns the highest funds reached after a close.
    pub fn peak_funds(&self) -> f64 {
        self.peak_funds
    }

    /// Alias of [`Statistics::peak_funds`].
    pub fn max_funds(&self) -> f64 {
        self.peak_funds
    }

    /// Returns the capital tied up in the open position ("locked" funds).
    pub fn invested_funds(&self) -> f64 {
        self.invested_funds
    }

    /// Returns the sum of gains.
    pub fn gross_profit(&self) -> f64 {
        self.gross_profit
    }

    /// Returns the sum of losses, as a positive amount.
    pub fn gross_loss(&self) -> f64 {
        self.gross_loss
    }

    /// Returns the number of winning closes.
    pub fn win_count(&self) -> u64 {
        self.win_count
    }

    /// Returns the number of losing closes.
    pub fn loss_count(&self) -> u64 {
        self.loss_count
    }

    /// Returns the number of losing closes since the last win.
    pub fn current_loss_streak(&self) -> u64 {
        self.current_loss_streak
    }

    /// Returns the longest run of consecutive losing closes.
    pub fn max_loss_streak(&self) -> u64 {
        self.max_loss_streak
    }

    /// Returns the largest decline from a peak, as a fraction (0.25 = 25%).
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Returns the drawdown-adjusted return computed by the installed policy.
    pub fn drawdown_return(&self) -> f64 {
        self.drawdown_return
    }

    /// Gross profit minus gross loss.
    pub fn net_profit(&self) -> f64 {
        self.gross_profit - self.gross_loss
    }

    /// Number of closes counted as a win or a loss.
    pub fn trade_count(&self) -> u64 {
        self.win_count + self.loss_count
    }

    /// Percentage of counted closes that were wins.
    pub fn win_rate(&self) -> f64 {
        let trades = self.trade_count();
        if trades == 0 {
            return 0.0;
        }
        (self.win_count as f64 / trades as f64) * 100.0
    }

    /// Ratio of gross profit to gross loss, infinite without losses.
    pub fn profit_factor(&self) -> f64 {
        if self.gross_loss == 0.0 {
            return f64::INFINITY;
        }
        self.gross_profit / self.gross_loss
    }

    /// Change of the current funds against the initial funds, in percent.
    pub fn return_pct(&self) -> f64 {
        if self.initial_funds == 0.0 {
            return 0.0;
        }
        (self.current_funds - self.initial_funds) / self.initial_funds * 100.0
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Statistics ===")?;
        writeln!(f, "Initial Funds: {:.2}", self.initial_funds)?;
        writeln!(f, "Current Funds: {:.2} ({:+.2}%)", self.current_funds, self.return_pct())?;
        writeln!(f, "Max Funds: {:.2}", self.peak_funds)?;
        writeln!(f, "Invested Funds: {:.2}", self.invested_funds)?;
        #[allow(clippy::writeln_empty_string)]
        writeln!(f, "")?;
        writeln!(f, "Trades: {} ({} won, {} lost)", self.trade_count(), self.win_count, self.loss_count)?;
        writeln!(f, "Gross Profit: {:.2}", self.gross_profit)?;
        writeln!(f, "Gross Loss: {:.2}", self.gross_loss)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor())?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate())?;
        writeln!(f, "Max Loss Streak: {}", self.max_loss_streak)?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Drawdown Return: {:.2}", self.drawdown_return)
    }
}

/// Incremental aggregator fed by position open and close events.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    stats: Statistics,
    breakeven: Breakeven,
    policy: Arc<dyn DrawdownReturnPolicy>,
}

impl Deref for StatisticsEngine {
    type Target = Statistics;

    fn deref(&self) -> &Self::Target {
        &self.stats
    }
}

impl StatisticsEngine {
    /// Creates an engine for a run funded with `initial_funds`.
    pub fn new(initial_funds: f64) -> Self {
        Self {
            stats: Statistics::new(initial_funds),
            breakeven: Breakeven::default(),
            policy: Arc::new(FundsOverMaxDrawdown),
        }
    }

    /// Replaces the drawdown-return policy.
    pub fn with_policy(mut self, policy: Arc<dyn DrawdownReturnPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Sets how breakeven closes are counted.
    pub fn with_breakeven(mut self, breakeven: Breakeven) -> Self {
        self.breakeven = breakeven;
        self
    }

    /// Returns a copy of the current figures.
    pub fn snapshot(&self) -> Statistics {
        self.stats
    }

    /// Records a position being opened with `invested` capital.
    pub fn on_open(&mut self, invested: f64) {
        self.stats.current_funds -= invested;
        self.stats.invested_funds = invested;
    }

    /// Records the open position being closed for `proceeds`.
    pub fn on_close(&mut self, proceeds: f64) {
        let stats = &mut self.stats;
        let profit = proceeds - stats.invested_funds;

        stats.current_funds += proceeds;
        stats.invested_funds = 0.0;

        if profit > 0.0 || (profit == 0.0 && self.breakeven == Breakeven::Win) {
            stats.gross_profit += profit;
            stats.win_count += 1;
            stats.current_loss_streak = 0;
        } else if profit < 0.0 {
            stats.gross_loss -= profit;
            stats.loss_count += 1;
            stats.current_loss_streak += 1;
            stats.max_loss_streak = stats.max_loss_streak.max(stats.current_loss_streak);
        }

        if stats.current_funds > stats.peak_funds {
            stats.peak_funds = stats.current_funds;
        } else if stats.peak_funds > 0.0 {
            let drawdown = (stats.peak_funds - stats.current_funds) / stats.peak_funds;
            stats.max_drawdown = stats.max_drawdown.max(drawdown);
        }

        stats.drawdown_return = self.policy.evaluate(stats.drawdown_return, stats);
    }
}
