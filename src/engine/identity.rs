use std::fmt;

/// Identifies one backtest configuration: the account that owns it and the
/// strategy it runs.
///
/// Equality and hashing cover both fields, so the type can key the maps an
/// orchestration layer keeps (active runs, finished reports). The engine
/// itself only hands it out.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunIdentity {
    account_name: String,
    strategy_name: String,
}

impl RunIdentity {
    /// Creates a new identity.
    pub fn new(account_name: impl Into<String>, strategy_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            strategy_name: strategy_name.into(),
        }
    }

    /// Returns the account name.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Returns the strategy name.
    pub fn strategy_name(&self) -> &str {
        &self.strategy_name
    }
}

impl From<(&str, &str)> for RunIdentity {
    fn from((account_name, strategy_name): (&str, &str)) -> Self {
        Self::new(account_name, strategy_name)
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_name, self.strategy_name)
    }
}
