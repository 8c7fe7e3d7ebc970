use std::fmt::Display;

use super::ReconciliationError;

/// A summary of a single reconciliation tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Orders that were pending at the start of the tick
    pub dispatched: usize,
    /// Orders whose status changed, without a credit
    pub updated: usize,
    /// Orders that moved to `Processed` and credited their owner
    pub credited: usize,
    /// Orders the accrual service does not know about yet
    pub unknown: usize,
    /// Results that did not change anything, e.g. `Processing` for an order that was already `Processing`
    pub skipped: usize,
    /// Results that could not be written to the database
    pub failed: usize,
    /// Set when a rate limit or transient failure cut the tick short
    pub interrupted_by: Option<ReconciliationError>,
}

impl TickReport {
    pub fn new(dispatched: usize) -> Self {
        Self { dispatched, ..Default::default() }
    }

    /// The number of results that came back from the accrual service and were dealt with.
    pub fn resolved(&self) -> usize {
        self.updated + self.credited + self.unknown + self.skipped + self.failed
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted_by.is_some()
    }
}

impl Display for TickReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pending, {} updated, {} credited, {} unknown, {} unchanged, {} failed",
            self.dispatched, self.updated, self.credited, self.unknown, self.skipped, self.failed
        )?;
        if let Some(e) = &self.interrupted_by {
            write!(f, ". Interrupted: {e}")?;
        }
        Ok(())
    }
}
