//! Terminal report of a run and the sink that receives it.

use std::{fmt, sync::mpsc::Sender};

use chrono::{DateTime, Utc};

use crate::{
    engine::RunIdentity,
    errors::{Error, Result},
    statistics::Statistics,
    utils::random_id,
};

/// Correlation id handed to a run at construction and echoed in its report.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportId(u64);

impl ReportId {
    /// Wraps a caller-supplied id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generates a random id.
    pub fn random() -> Self {
        Self(random_id())
    }

    /// Returns the raw id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What a finished run leaves behind.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Correlation id supplied when the run was built.
    pub id: ReportId,
    /// Account and strategy of the run.
    pub identity: RunIdentity,
    /// Final statistics.
    pub statistics: Statistics,
    /// Spendable cash at the end.
    pub cash: f64,
    /// Stop-loss reserve still held, non-zero only if a position was left open.
    pub reserved: f64,
    /// Whether a position was still open when the run finished.
    pub position_open: bool,
    /// Value of the position left open, marked at the price of the quote
    /// that ended the window. `None` when no position was open.
    pub position_value: Option<f64>,
    /// Timestamp of the quote that ended the window.
    pub finished_at: DateTime<Utc>,
}

/// Receives the terminal report of a run, exactly once per run.
pub trait ReportSink {
    /// Stores or forwards the report.
    fn submit(&mut self, report: Report) -> Result<()>;
}

impl ReportSink for Vec<Report> {
    fn submit(&mut self, report: Report) -> Result<()> {
        self.push(report);
        Ok(())
    }
}

impl ReportSink for Sender<Report> {
    fn submit(&mut self, report: Report) -> Result<()> {
        self.send(report).map_err(|err| Error::Sink(err.to_string()))
    }
}
