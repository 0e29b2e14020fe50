use std::collections::{BTreeMap, BTreeSet};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{Error, Identity, Proposal, ProposalId, Result};

/// The persisted form of a ledger: the authority, the id counter, the
/// proposals and the (proposal, voter) records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot<I: Identity> {
    pub authority: I,
    pub next_id: ProposalId,
    pub proposals: BTreeMap<ProposalId, Proposal<I>>,
    pub votes: BTreeSet<(ProposalId, I)>,
}

impl<I: Identity> LedgerSnapshot<I> {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        I: DeserializeOwned,
    {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.next_id == 0 {
            return Err(Error::CorruptSnapshot("next_id must start at 1".into()));
        }
        if self.proposals.len() as u64 != self.next_id - 1 {
            return Err(Error::CorruptSnapshot(format!(
                "{} proposals stored but next_id is {}",
                self.proposals.len(),
                self.next_id
            )));
        }

        let mut votes_per_proposal: BTreeMap<ProposalId, u64> = Default::default();
        for (proposal_id, _) in self.votes.iter() {
            *votes_per_proposal.entry(*proposal_id).or_default() += 1;
        }

        for (expected_id, (id, proposal)) in (1..self.next_id).zip(self.proposals.iter()) {
            if *id != expected_id || proposal.id != expected_id {
                return Err(Error::CorruptSnapshot(format!(
                    "expected proposal {expected_id}, found key {id} holding proposal {}",
                    proposal.id
                )));
            }
            let records = votes_per_proposal.remove(id).unwrap_or_default();
            let counted = proposal.total_votes().ok_or_else(|| {
                Error::CorruptSnapshot(format!(
                    "proposal {id} tallies overflow: +{} / -{}",
                    proposal.upvotes, proposal.downvotes
                ))
            })?;
            if records != counted {
                return Err(Error::CorruptSnapshot(format!(
                    "proposal {id} counts {counted} votes but {records} records exist"
                )));
            }
        }

        if let Some((orphan, _)) = votes_per_proposal.into_iter().next() {
            return Err(Error::CorruptSnapshot(format!(
                "vote records reference unknown proposal {orphan}"
            )));
        }

        Ok(())
    }
}
