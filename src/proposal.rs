use core::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

use crate::{Identity, Timestamp};

pub type ProposalId = u64;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal<I: Identity> {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub deadline: Timestamp,
    pub upvotes: u64,
    pub downvotes: u64,
    pub finalized: bool,
    pub proposer: I,
}

impl<I: Identity> Debug for Proposal<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{}[{:?}]-D{}-+{}/-{}",
            self.id, self.title, self.deadline, self.upvotes, self.downvotes
        )?;
        if self.finalized {
            write!(f, "-F")?;
        }
        Ok(())
    }
}

impl<I: Identity> Proposal<I> {
    /// Votes are accepted strictly before the deadline.
    pub fn is_open(&self, now: Timestamp) -> bool {
        !self.finalized && now < self.deadline
    }

    /// The outcome the tallies currently point to. Ties reject.
    pub fn outcome(&self) -> Outcome {
        if self.upvotes > self.downvotes {
            Outcome::Accepted
        } else {
            Outcome::Rejected
        }
    }

    pub fn status(&self, now: Timestamp) -> ProposalStatus {
        if self.finalized {
            self.outcome().into()
        } else if now < self.deadline {
            ProposalStatus::Active
        } else {
            ProposalStatus::PendingFinalization
        }
    }

    /// `None` when the tallies cannot both be real, i.e. their sum overflows.
    pub fn total_votes(&self) -> Option<u64> {
        self.upvotes.checked_add(self.downvotes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Accepted,
    Rejected,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Accepted => write!(f, "Accepted"),
            Outcome::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    PendingFinalization,
    Accepted,
    Rejected,
}

impl From<Outcome> for ProposalStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Accepted => ProposalStatus::Accepted,
            Outcome::Rejected => ProposalStatus::Rejected,
        }
    }
}
