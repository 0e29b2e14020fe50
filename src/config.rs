use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Identity, Result};

/// One year, in seconds.
pub const DEFAULT_MAX_DURATION: u64 = 365 * 24 * 60 * 60;

/// Settings fixed once when a ledger is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig<I: Identity> {
    /// The only identity allowed to create proposals.
    pub authority: I,
    /// Upper bound on a proposal's voting window in seconds, `None` for no bound.
    pub max_duration: Option<u64>,
}

impl<I: Identity> LedgerConfig<I> {
    pub fn new(authority: I) -> Self {
        Self {
            authority,
            max_duration: Some(DEFAULT_MAX_DURATION),
        }
    }

    #[must_use]
    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = Some(max.as_secs());
        self
    }

    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_duration = None;
        self
    }

    pub fn validate_duration(&self, duration: u64) -> Result<()> {
        if duration == 0 {
            return Err(Error::InvalidArgument(
                "duration must be a positive number of seconds".to_string(),
            ));
        }
        match self.max_duration {
            Some(max) if duration > max => Err(Error::InvalidArgument(format!(
                "duration {duration}s exceeds the maximum of {max}s"
            ))),
            _ => Ok(()),
        }
    }
}
