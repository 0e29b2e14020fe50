use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use blsttc::PublicKey;

use crate::event::Sequenced;
use crate::tx::{Call, Receipt, SignedTransaction};
use crate::{
    Clock, Error, Identity, Ledger, LedgerSnapshot, Outcome, Proposal, ProposalId,
    ProposalStatus, Result,
};

/// A [`Ledger`] behind a lock, for callers on several threads.
///
/// Mutators serialize on the write lock, so racing votes and finalizations
/// land in a single total order. Reads return owned copies.
#[derive(Debug)]
pub struct SharedLedger<I: Identity, C: Clock> {
    inner: Arc<RwLock<Ledger<I, C>>>,
}

impl<I: Identity, C: Clock> Clone for SharedLedger<I, C> {
    fn clone(&self) -> Self {
        SharedLedger {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Identity, C: Clock> From<Ledger<I, C>> for SharedLedger<I, C> {
    fn from(ledger: Ledger<I, C>) -> Self {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }
}

impl<I: Identity, C: Clock> SharedLedger<I, C> {
    fn read(&self) -> Result<RwLockReadGuard<'_, Ledger<I, C>>> {
        self.inner.read().map_err(|_| Error::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Ledger<I, C>>> {
        self.inner.write().map_err(|_| Error::LockPoisoned)
    }

    pub fn create_proposal(
        &self,
        caller: &I,
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        duration: Duration,
    ) -> Result<ProposalId> {
        self.write()?
            .create_proposal(caller, title, description, category, duration)
    }

    pub fn cast_vote(&self, caller: &I, proposal_id: ProposalId, support: bool) -> Result<()> {
        self.write()?.cast_vote(caller, proposal_id, support)
    }

    pub fn finalize(&self, caller: &I, proposal_id: ProposalId) -> Result<Outcome> {
        self.write()?.finalize(caller, proposal_id)
    }

    pub fn execute(&self, caller: &I, call: Call) -> Result<Receipt> {
        self.write()?.execute(caller, call)
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal<I>> {
        self.read()?.get_proposal(proposal_id)
    }

    pub fn has_voted(&self, proposal_id: ProposalId, identity: &I) -> Result<bool> {
        Ok(self.read()?.has_voted(proposal_id, identity))
    }

    pub fn proposal_count(&self) -> Result<u64> {
        Ok(self.read()?.proposal_count())
    }

    /// Copies of every proposal, in id order.
    pub fn proposals(&self) -> Result<Vec<Proposal<I>>> {
        Ok(self.read()?.proposals().cloned().collect())
    }

    pub fn authority(&self) -> Result<I> {
        Ok(self.read()?.authority().clone())
    }

    pub fn status(&self, proposal_id: ProposalId) -> Result<ProposalStatus> {
        self.read()?.status(proposal_id)
    }

    pub fn events_since(&self, seq: u64) -> Result<Vec<Sequenced<I>>> {
        Ok(self.read()?.events_since(seq))
    }

    pub fn drain_events(&self) -> Result<Vec<Sequenced<I>>> {
        Ok(self.write()?.drain_events())
    }

    pub fn last_event_seq(&self) -> Result<u64> {
        Ok(self.read()?.last_event_seq())
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot<I>> {
        Ok(self.read()?.snapshot())
    }
}

impl<C: Clock> SharedLedger<PublicKey, C> {
    pub fn submit(&self, signed_tx: &SignedTransaction) -> Result<Receipt> {
        self.write()?.submit(signed_tx)
    }
}
