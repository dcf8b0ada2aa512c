//! Run configuration.
//!
//! A [`RunConfig`] is validated once, when it is loaded or built, and then
//! handed to [`Run::new`](crate::engine::Run::new) which trusts it.

use chrono::{DateTime, Utc};

use crate::{
    engine::{RunIdentity, WindowEndPolicy},
    errors::{Error, Result},
    statistics::Breakeven,
};

/// Everything needed to build a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Account that owns the run.
    pub account_name: String,
    /// Name of the strategy under test.
    pub strategy_name: String,
    /// Asset the quotes are for.
    pub asset: String,
    /// Start of the replay window.
    pub window_start: DateTime<Utc>,
    /// Quotes after this instant finish the run.
    pub window_end: DateTime<Utc>,
    /// Cash the run starts with.
    pub initial_funds: f64,
    /// Upper bound on the capital a single position may commit.
    pub position_size_cap: f64,
    /// What happens to a position still open when the window ends.
    #[cfg_attr(feature = "serde", serde(default))]
    pub window_end_policy: WindowEndPolicy,
    /// How closes without gain or loss are counted.
    #[cfg_attr(feature = "serde", serde(default))]
    pub breakeven: Breakeven,
}

impl RunConfig {
    /// Creates a configuration with the default policies and validates it.
    pub fn new(
        account_name: impl Into<String>,
        strategy_name: impl Into<String>,
        asset: impl Into<String>,
        window: (DateTime<Utc>, DateTime<Utc>),
        initial_funds: f64,
        position_size_cap: f64,
    ) -> Result<Self> {
        let config = Self {
            account_name: account_name.into(),
            strategy_name: strategy_name.into(),
            asset: asset.into(),
            window_start: window.0,
            window_end: window.1,
            initial_funds,
            position_size_cap,
            window_end_policy: WindowEndPolicy::default(),
            breakeven: Breakeven::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the window-end policy.
    pub fn with_window_end_policy(mut self, policy: WindowEndPolicy) -> Self {
        self.window_end_policy = policy;
        self
    }

    /// Sets how breakeven closes are counted.
    pub fn with_breakeven(mut self, breakeven: Breakeven) -> Self {
        self.breakeven = breakeven;
        self
    }

    /// Loads a JSON configuration file and validates it.
    #[cfg(feature = "serde")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config: Self = crate::utils::read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.account_name.trim().is_empty() {
            return Err(Error::InvalidConfig("account name is empty".into()));
        }
        if self.strategy_name.trim().is_empty() {
            return Err(Error::InvalidConfig("strategy name is empty".into()));
        }
        if self.window_start > self.window_end {
            return Err(Error::InvalidConfig(format!(
                "window starts at {} after it ends at {}",
                self.window_start, self.window_end
            )));
        }
        if self.initial_funds < 0.0 || !self.initial_funds.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "initial funds must be non-negative (got: {})",
                self.initial_funds
            )));
        }
        if self.position_size_cap < 0.0 || !self.position_size_cap.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "position size cap must be non-negative (got: {})",
                self.position_size_cap
            )));
        }
        Ok(())
    }

    /// Returns the identity of runs built from this configuration.
    pub fn identity(&self) -> RunIdentity {
        RunIdentity::new(self.account_name.as_str(), self.strategy_name.as_str())
    }
}
