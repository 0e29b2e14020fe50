use thiserror::Error;

use crate::{ProposalId, Timestamp};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Only the authority can perform this action: caller {caller} != authority {authority}")]
    Unauthorized { caller: String, authority: String },
    #[error("Proposal {0} does not exist")]
    NotFound(ProposalId),
    #[error("Proposal {0} already finalized")]
    AlreadyFinalized(ProposalId),
    #[error("Voting period has ended for proposal {proposal_id}: now {now} >= deadline {deadline}")]
    VotingClosed {
        proposal_id: ProposalId,
        deadline: Timestamp,
        now: Timestamp,
    },
    #[error("Voting period is still ongoing for proposal {proposal_id}: now {now} < deadline {deadline}")]
    VotingStillOpen {
        proposal_id: ProposalId,
        deadline: Timestamp,
        now: Timestamp,
    },
    #[error("Voter {voter} has already voted on proposal {proposal_id}")]
    DuplicateVote {
        proposal_id: ProposalId,
        voter: String,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to encode with bincode")]
    Encoding(#[from] bincode::Error),
    #[error("Transaction signature is not valid")]
    InvalidSignature,
    #[error("Snapshot violates ledger invariants: {0}")]
    CorruptSnapshot(String),
    #[error("Ledger lock was poisoned by a panicking writer")]
    LockPoisoned,
}
