use core::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::{Identity, Outcome, Proposal, ProposalId};

/// Notifications emitted by the ledger's mutators.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event<I: Identity> {
    ProposalCreated(Proposal<I>),
    Voted {
        proposal_id: ProposalId,
        voter: I,
        support: bool,
    },
    ProposalFinalized {
        proposal_id: ProposalId,
        outcome: Outcome,
    },
}

impl<I: Identity> Debug for Event<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ProposalCreated(p) => write!(f, "C({:?})", p),
            Event::Voted {
                proposal_id,
                voter,
                support,
            } => write!(
                f,
                "V{}({:?}{})",
                proposal_id,
                voter,
                if *support { "+" } else { "-" }
            ),
            Event::ProposalFinalized {
                proposal_id,
                outcome,
            } => write!(f, "F{}({})", proposal_id, outcome),
        }
    }
}

impl<I: Identity> Event<I> {
    pub fn proposal_id(&self) -> ProposalId {
        match self {
            Event::ProposalCreated(p) => p.id,
            Event::Voted { proposal_id, .. } | Event::ProposalFinalized { proposal_id, .. } => {
                *proposal_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequenced<I: Identity> {
    pub seq: u64,
    pub event: Event<I>,
}

/// Ordered log of everything the ledger has emitted.
///
/// Sequence numbers start at 1 and are never reused, even after a drain.
#[derive(Debug, Clone)]
pub struct EventLog<I: Identity> {
    next_seq: u64,
    events: Vec<Sequenced<I>>,
}

impl<I: Identity> Default for EventLog<I> {
    fn default() -> Self {
        Self {
            next_seq: 1,
            events: Default::default(),
        }
    }
}

impl<I: Identity> EventLog<I> {
    pub fn push(&mut self, event: Event<I>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Sequenced { seq, event });
        seq
    }

    /// Everything emitted after `seq`, oldest first. A subscriber that has
    /// seen nothing passes 0.
    pub fn since(&self, seq: u64) -> Vec<Sequenced<I>> {
        // events are stored in seq order
        let start = self.events.partition_point(|e| e.seq <= seq);
        self.events[start..].to_vec()
    }

    pub fn drain(&mut self) -> Vec<Sequenced<I>> {
        std::mem::take(&mut self.events)
    }

    pub fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized(id: ProposalId) -> Event<u8> {
        Event::ProposalFinalized {
            proposal_id: id,
            outcome: Outcome::Rejected,
        }
    }

    #[test]
    fn test_since_returns_events_after_seq() {
        let mut log = EventLog::default();
        assert_eq!(log.push(finalized(1)), 1);
        assert_eq!(log.push(finalized(2)), 2);
        assert_eq!(log.push(finalized(3)), 3);

        let ids: Vec<_> = log.since(1).iter().map(|s| s.event.proposal_id()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(log.since(3).is_empty());
        assert_eq!(log.since(0).len(), 3);
    }

    #[test]
    fn test_drain_keeps_sequence_numbers_monotone() {
        let mut log = EventLog::default();
        log.push(finalized(1));
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
        assert_eq!(log.push(finalized(2)), 2);
        assert_eq!(log.last_seq(), 2);
    }
}
