#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cash ledger of a run.
///
/// `cash` is what the strategy can still spend. `reserved` is the stop-loss
/// buffer set aside while a position is open; it is zero otherwise and goes
/// back to cash when the position is settled.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    // Spendable cash
    cash: f64,
    // Stop-loss buffer of the open position
    reserved: f64,
}

impl Wallet {
    /// Creates a wallet holding `cash`.
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            reserved: 0.0,
        }
    }

    /// Returns the spendable cash.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the funds held back as a stop-loss buffer.
    pub fn reserved(&self) -> f64 {
        self.reserved
    }

    /// Returns how much a trade can commit after setting `reserve` aside,
    /// capped by `cap`. `None` when the cash does not cover the reserve.
    pub(crate) fn investable(&self, reserve: f64, cap: f64) -> Option<f64> {
        if self.cash < reserve {
            return None;
        }
        Some(cap.min(self.cash - reserve).max(0.0))
    }

    /// Moves `invested` out of the wallet and sets `reserve` aside.
    /// Callers obtain `invested` from [`Wallet::investable`].
    pub(crate) fn commit(&mut self, invested: f64, reserve: f64) {
        // same operand order as `investable`, so committing all the cash lands on exactly 0.0
        self.cash = self.cash - reserve - invested;
        self.reserved = reserve;
    }

    /// Returns the proceeds of a closed trade and releases the reserve.
    pub(crate) fn settle(&mut self, proceeds: f64) {
        self.cash += proceeds + self.reserved;
        self.reserved = 0.0;
    }
}

#[cfg(test)]
#[test]
fn new_wallet() {
    let wallet = Wallet::new(100.0);
    assert_eq!(wallet.cash(), 100.0);
    assert_eq!(wallet.reserved(), 0.0);
}

#[cfg(test)]
#[test]
fn investable_is_capped() {
    let wallet = Wallet::new(1000.0);
    assert_eq!(wallet.investable(20.0, 150.0), Some(150.0));
    assert_eq!(wallet.investable(900.0, 150.0), Some(100.0));
    assert_eq!(wallet.investable(1000.0, 150.0), Some(0.0));
}

#[cfg(test)]
#[test]
fn investable_declines_uncovered_reserve() {
    let wallet = Wallet::new(100.0);
    assert_eq!(wallet.investable(100.01, 50.0), None);
}

#[cfg(test)]
#[test]
fn commit_and_settle() {
    let mut wallet = Wallet::new(1000.0);
    let invested = wallet.investable(20.0, 150.0).unwrap();
    wallet.commit(invested, 20.0);
    assert_eq!(wallet.cash(), 830.0);
    assert_eq!(wallet.reserved(), 20.0);

    // close with a 50 profit
    wallet.settle(200.0);
    assert_eq!(wallet.cash(), 1050.0);
    assert_eq!(wallet.reserved(), 0.0);
}

#[cfg(test)]
#[test]
fn commit_everything_leaves_zero() {
    let mut wallet = Wallet::new(100.0);
    let invested = wallet.investable(30.0, 500.0).unwrap();
    wallet.commit(invested, 30.0);
    assert_eq!(wallet.cash(), 0.0);
    assert_eq!(wallet.reserved(), 30.0);
}
