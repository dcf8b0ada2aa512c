use crate::errors::{Error, Result};

/// The single trade a run may hold.
///
/// A position starts closed. Opening it records the entry price and the capital
/// committed; closing it values that capital at the exit price and hands the
/// proceeds back. The valuation lives here so that fees or slippage can be
/// added without touching the fund bookkeeping.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    entry_price: f64,
    invested_amount: f64,
    is_open: bool,
}

impl Position {
    /// Creates a closed position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the position.
    ///
    /// ### Arguments
    /// * `entry_price` - Price paid per unit, must be positive.
    /// * `invested_amount` - Capital committed, must be non-negative.
    pub fn open(&mut self, entry_price: f64, invested_amount: f64) -> Result<()> {
        if self.is_open {
            return Err(Error::InvalidState("position is already open"));
        }
        if entry_price <= 0.0 || !entry_price.is_finite() {
            return Err(Error::InvalidPrice(entry_price));
        }
        if invested_amount < 0.0 || !invested_amount.is_finite() {
            return Err(Error::InvalidAmount(invested_amount));
        }

        self.entry_price = entry_price;
        self.invested_amount = invested_amount;
        self.is_open = true;
        Ok(())
    }

    /// Closes the position and returns its proceeds,
    /// `invested_amount * exit_price / entry_price`.
    pub fn close(&mut self, exit_price: f64) -> Result<f64> {
        if !self.is_open {
            return Err(Error::InvalidState("no position is open"));
        }
        if exit_price <= 0.0 || !exit_price.is_finite() {
            return Err(Error::InvalidPrice(exit_price));
        }

        self.is_open = false;
        Ok(self.invested_amount * (exit_price / self.entry_price))
    }

    /// Returns `true` between a successful open and the matching close.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Returns the entry price of the last opened trade.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the capital committed by the last opened trade.
    pub fn invested_amount(&self) -> f64 {
        self.invested_amount
    }

    /// Values the open position at `price` without closing it.
    pub fn estimate_value(&self, price: f64) -> Option<f64> {
        self.is_open.then(|| self.invested_amount * (price / self.entry_price))
    }
}

#[cfg(test)]
#[test]
fn starts_closed() {
    let position = Position::new();
    assert!(!position.is_open());
    assert_eq!(position.estimate_value(10.0), None);
}

#[cfg(test)]
#[test]
fn open_then_close() {
    let mut position = Position::new();
    position.open(12.3, 150.0).unwrap();
    assert!(position.is_open());
    assert_eq!(position.entry_price(), 12.3);

    let proceeds = position.close(35.0).unwrap();
    assert!((proceeds - 426.83).abs() < 0.01);
    assert!(!position.is_open());
}

#[cfg(test)]
#[test]
fn close_at_entry_returns_invested() {
    let mut position = Position::new();
    position.open(50.0, 75.2).unwrap();
    assert!((position.close(50.0).unwrap() - 75.2).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn open_twice_fails() {
    let mut position = Position::new();
    position.open(10.0, 100.0).unwrap();
    let result = position.open(11.0, 50.0);
    assert!(matches!(result, Err(Error::InvalidState(_))));
    // unchanged
    assert_eq!(position.entry_price(), 10.0);
    assert_eq!(position.invested_amount(), 100.0);
}

#[cfg(test)]
#[test]
fn close_without_open_fails() {
    let mut position = Position::new();
    assert!(matches!(position.close(10.0), Err(Error::InvalidState(_))));
}

#[cfg(test)]
#[test]
fn rejects_bad_inputs() {
    let mut position = Position::new();
    assert!(matches!(position.open(0.0, 10.0), Err(Error::InvalidPrice(_))));
    assert!(matches!(position.open(f64::NAN, 10.0), Err(Error::InvalidPrice(_))));
    assert!(matches!(position.open(10.0, -1.0), Err(Error::InvalidAmount(_))));
    assert!(!position.is_open());

    position.open(10.0, 10.0).unwrap();
    assert!(matches!(position.close(-5.0), Err(Error::InvalidPrice(_))));
    assert!(position.is_open());
}

#[cfg(test)]
#[test]
fn estimate_value_of_open_position() {
    let mut position = Position::new();
    position.open(100.0, 200.0).unwrap();
    let value = position.estimate_value(110.0).unwrap();
    assert!((value - 220.0).abs() < 0.01);
    assert!(position.is_open());

    position.close(110.0).unwrap();
    assert_eq!(position.estimate_value(110.0), None);
}
