//! # Strategy Backtest
//!
//! Replays a time-ordered stream of price quotes against a single trading
//! strategy, keeps a simulated cash ledger and maintains running performance
//! statistics.
//!
//! ## Core Components
//! | Component            | Description                                                                  |
//! |----------------------|------------------------------------------------------------------------------|
//! | **`Run`**            | Drives the strategy quote by quote and owns the books of one backtest.       |
//! | **`Position`**       | The single trade a run may hold, valued at its entry and exit prices.        |
//! | **`Wallet`**         | Spendable cash and the stop-loss reserve of the open position.               |
//! | **`StatisticsEngine`** | Constant-time drawdown, loss-streak and win/loss aggregation.              |
//! | **`RunIdentity`**    | Account and strategy name a run belongs to.                                  |
//! | **`Report`**         | Final statistics, emitted once when the time window is exceeded.             |
//!
//! ## Rules of a Run
//! - At most one position is open at any time.
//! - Cash never goes negative. An open request whose stop-loss reserve exceeds
//!   the cash is declined, silently.
//! - A quote after the window end finishes the run. The strategy is never
//!   consulted again and the report is handed to the sink exactly once.
//!
//! ## Example
//! ```rust
//! use strategy_backtest::prelude::*;
//! use chrono::{DateTime, Duration, Utc};
//!
//! let start: DateTime<Utc> = DateTime::default();
//! let config = RunConfig::new("alice", "dip-buyer", "GOLD", (start, start + Duration::days(1)), 1_000.0, 150.0)
//!     .unwrap();
//! let mut run = Run::new(&config, ReportId::random(), Vec::<Report>::new());
//!
//! let quotes = vec![
//!     Quote::new("GOLD", 10.0, QuoteKind::Buy, start),
//!     Quote::new("GOLD", 12.0, QuoteKind::Buy, start + Duration::hours(1)),
//!     Quote::new("GOLD", 12.0, QuoteKind::Buy, start + Duration::days(2)),
//! ];
//!
//! let mut strategy = |quote: &Quote, run: &mut Run| -> Result<()> {
//!     if run.is_position_open() {
//!         run.close_position(quote.price())?;
//!     } else {
//!         run.open_position(quote.price(), 20.0)?;
//!     }
//!     Ok(())
//! };
//!
//! let state = run.run(quotes, &mut strategy).unwrap();
//! assert_eq!(state, RunState::Finished);
//!
//! let report = run.report().unwrap();
//! assert_eq!(report.statistics.win_count(), 1);
//! println!("{}", report.statistics);
//! ```
//!
//! ## Logging
//! The engine logs through [`tracing`](https://crates.io/crates/tracing) and
//! never installs a subscriber; that is left to the application.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Run configuration and its validation.
pub mod config;

/// Core engine: run orchestrator, position, wallet, quotes and identities.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Terminal report and report sinks.
pub mod report;

/// Running statistics: funds, drawdown, streaks, win/loss aggregation.
pub mod statistics;

/// Utility functions and helpers.
mod utils;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::report::*;
    pub use crate::statistics::*;
}
