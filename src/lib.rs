pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod proposal;
pub mod shared;
pub mod snapshot;
pub mod tx;

use core::fmt::Debug;
use serde::Serialize;

pub use crate::clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use crate::config::{LedgerConfig, DEFAULT_MAX_DURATION};
pub use crate::error::Error;
pub use crate::event::{Event, EventLog, Sequenced};
pub use crate::ledger::Ledger;
pub use crate::proposal::{Outcome, Proposal, ProposalId, ProposalStatus};
pub use crate::shared::SharedLedger;
pub use crate::snapshot::LedgerSnapshot;
pub use crate::tx::{Call, Receipt, SignedTransaction, Transaction};

pub use blsttc::{PublicKey, SecretKey, Signature};

pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can stand in for a caller: the authority, a voter or a finalizer.
pub trait Identity: Ord + Clone + Debug + Serialize {}
impl<T: Ord + Clone + Debug + Serialize> Identity for T {}
