use chrono::{DateTime, Utc};

/// Side of the book a quote was taken from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    /// Price offered to buyers.
    Buy,
    /// Price offered to sellers.
    Sell,
}

/// A single price observation for an asset.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    asset: String,
    price: f64,
    kind: QuoteKind,
    timestamp: DateTime<Utc>,
}

impl Quote {
    /// Creates a new quote.
    pub fn new(asset: impl Into<String>, price: f64, kind: QuoteKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            asset: asset.into(),
            price,
            kind,
            timestamp,
        }
    }

    /// Returns the asset the price is for.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Returns the quoted price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Returns the side of the book.
    pub fn kind(&self) -> QuoteKind {
        self.kind
    }

    /// Returns when the price was observed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
