use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use blsttc::PublicKey;
use log::{debug, info};

use crate::event::{Event, EventLog, Sequenced};
use crate::tx::{short_hex, Call, Receipt, SignedTransaction};
use crate::{
    Clock, Error, Identity, LedgerConfig, LedgerSnapshot, Outcome, Proposal, ProposalId,
    ProposalStatus, Result, Timestamp,
};

/// The proposal ledger state machine.
///
/// Every mutator checks all of its preconditions before touching state, so a
/// call either applies completely or leaves the ledger exactly as it was.
#[derive(Debug)]
pub struct Ledger<I: Identity, C: Clock> {
    pub(crate) config: LedgerConfig<I>,
    pub(crate) clock: C,
    pub(crate) next_id: ProposalId,
    pub(crate) proposals: BTreeMap<ProposalId, Proposal<I>>,
    pub(crate) votes: BTreeSet<(ProposalId, I)>,
    pub(crate) events: EventLog<I>,
}

impl<I: Identity, C: Clock> Ledger<I, C> {
    pub fn from(config: LedgerConfig<I>, clock: C) -> Self {
        Ledger {
            config,
            clock,
            next_id: 1,
            proposals: Default::default(),
            votes: Default::default(),
            events: Default::default(),
        }
    }

    pub fn authority(&self) -> &I {
        &self.config.authority
    }

    pub fn config(&self) -> &LedgerConfig<I> {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Deadlines have one-second resolution, so `duration` must be a whole
    /// number of seconds.
    pub fn create_proposal(
        &mut self,
        caller: &I,
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        duration: Duration,
    ) -> Result<ProposalId> {
        if duration.subsec_nanos() != 0 {
            self.authorize(caller)?;
            return Err(Error::InvalidArgument(format!(
                "duration {:?} is not a whole number of seconds",
                duration
            )));
        }
        let now = self.clock.now();
        self.create_proposal_at(
            caller,
            title.into(),
            description.into(),
            category.into(),
            duration.as_secs(),
            now,
        )
    }

    pub fn create_proposal_at(
        &mut self,
        caller: &I,
        title: String,
        description: String,
        category: String,
        duration: u64,
        now: Timestamp,
    ) -> Result<ProposalId> {
        self.authorize(caller)?;
        self.config.validate_duration(duration)?;
        let deadline = now.checked_add(duration).ok_or_else(|| {
            Error::InvalidArgument(format!("deadline {now} + {duration} overflows"))
        })?;

        let id = self.next_id;
        let proposal = Proposal {
            id,
            title,
            description,
            category,
            deadline,
            upvotes: 0,
            downvotes: 0,
            finalized: false,
            proposer: caller.clone(),
        };
        info!("[LDG] created {:?}", proposal);

        self.next_id += 1;
        self.proposals.insert(id, proposal.clone());
        self.events.push(Event::ProposalCreated(proposal));
        Ok(id)
    }

    fn authorize(&self, caller: &I) -> Result<()> {
        if caller != &self.config.authority {
            debug!("[LDG] rejecting proposal from non-authority {:?}", caller);
            return Err(Error::Unauthorized {
                caller: format!("{:?}", caller),
                authority: format!("{:?}", self.config.authority),
            });
        }
        Ok(())
    }

    pub fn cast_vote(&mut self, caller: &I, proposal_id: ProposalId, support: bool) -> Result<()> {
        let now = self.clock.now();
        self.cast_vote_at(caller, proposal_id, support, now)
    }

    pub fn cast_vote_at(
        &mut self,
        caller: &I,
        proposal_id: ProposalId,
        support: bool,
        now: Timestamp,
    ) -> Result<()> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(Error::NotFound(proposal_id))?;

        if proposal.finalized {
            return Err(Error::AlreadyFinalized(proposal_id));
        }
        if now >= proposal.deadline {
            return Err(Error::VotingClosed {
                proposal_id,
                deadline: proposal.deadline,
                now,
            });
        }

        let record = (proposal_id, caller.clone());
        if self.votes.contains(&record) {
            debug!("[LDG] {:?} already voted on P{}", caller, proposal_id);
            return Err(Error::DuplicateVote {
                proposal_id,
                voter: format!("{:?}", caller),
            });
        }

        // record and count together, nothing can fail past this point
        self.votes.insert(record);
        if support {
            proposal.upvotes += 1;
        } else {
            proposal.downvotes += 1;
        }
        info!("[LDG] {:?} voted {} on {:?}", caller, support, proposal);

        self.events.push(Event::Voted {
            proposal_id,
            voter: caller.clone(),
            support,
        });
        Ok(())
    }

    /// Closes a proposal whose window has passed. Any identity may finalize.
    pub fn finalize(&mut self, caller: &I, proposal_id: ProposalId) -> Result<Outcome> {
        let now = self.clock.now();
        self.finalize_at(caller, proposal_id, now)
    }

    pub fn finalize_at(
        &mut self,
        caller: &I,
        proposal_id: ProposalId,
        now: Timestamp,
    ) -> Result<Outcome> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(Error::NotFound(proposal_id))?;

        if proposal.finalized {
            return Err(Error::AlreadyFinalized(proposal_id));
        }
        if now < proposal.deadline {
            return Err(Error::VotingStillOpen {
                proposal_id,
                deadline: proposal.deadline,
                now,
            });
        }

        proposal.finalized = true;
        let outcome = proposal.outcome();
        info!(
            "[LDG] {:?} finalized {:?} as {}",
            caller, proposal, outcome
        );

        self.events.push(Event::ProposalFinalized {
            proposal_id,
            outcome,
        });
        Ok(outcome)
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> Result<Proposal<I>> {
        self.proposals
            .get(&proposal_id)
            .cloned()
            .ok_or(Error::NotFound(proposal_id))
    }

    pub fn has_voted(&self, proposal_id: ProposalId, identity: &I) -> bool {
        self.votes.contains(&(proposal_id, identity.clone()))
    }

    pub fn proposal_count(&self) -> u64 {
        self.next_id - 1
    }

    /// Proposals in id order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal<I>> {
        self.proposals.values()
    }

    pub fn status(&self, proposal_id: ProposalId) -> Result<ProposalStatus> {
        let now = self.clock.now();
        self.proposals
            .get(&proposal_id)
            .map(|p| p.status(now))
            .ok_or(Error::NotFound(proposal_id))
    }

    pub fn events_since(&self, seq: u64) -> Vec<Sequenced<I>> {
        self.events.since(seq)
    }

    pub fn drain_events(&mut self) -> Vec<Sequenced<I>> {
        self.events.drain()
    }

    pub fn last_event_seq(&self) -> u64 {
        self.events.last_seq()
    }

    pub fn execute(&mut self, caller: &I, call: Call) -> Result<Receipt> {
        let now = self.clock.now();
        self.execute_at(caller, call, now)
    }

    pub fn execute_at(&mut self, caller: &I, call: Call, now: Timestamp) -> Result<Receipt> {
        match call {
            Call::CreateProposal {
                title,
                description,
                category,
                duration,
            } => self
                .create_proposal_at(caller, title, description, category, duration, now)
                .map(Receipt::Created),
            Call::CastVote {
                proposal_id,
                support,
            } => self
                .cast_vote_at(caller, proposal_id, support, now)
                .map(|()| Receipt::Voted {
                    proposal_id,
                    support,
                }),
            Call::Finalize { proposal_id } => {
                self.finalize_at(caller, proposal_id, now)
                    .map(|outcome| Receipt::Finalized {
                        proposal_id,
                        outcome,
                    })
            }
        }
    }

    /// Applies an ordered history of calls, each at its own recorded time.
    /// Two ledgers built from the same config and fed the same history end
    /// up in the same state.
    pub fn replay(
        &mut self,
        history: impl IntoIterator<Item = (Timestamp, I, Call)>,
    ) -> Vec<Result<Receipt>> {
        history
            .into_iter()
            .map(|(now, caller, call)| self.execute_at(&caller, call, now))
            .collect()
    }

    pub fn snapshot(&self) -> LedgerSnapshot<I> {
        LedgerSnapshot {
            authority: self.config.authority.clone(),
            next_id: self.next_id,
            proposals: self.proposals.clone(),
            votes: self.votes.clone(),
        }
    }

    /// Rebuilds a ledger from persisted state. The event log starts empty.
    pub fn restore(snapshot: LedgerSnapshot<I>, config: LedgerConfig<I>, clock: C) -> Result<Self> {
        if snapshot.authority != config.authority {
            return Err(Error::CorruptSnapshot(format!(
                "snapshot authority {:?} != configured authority {:?}",
                snapshot.authority, config.authority
            )));
        }
        snapshot.validate()?;
        info!(
            "[LDG] restored {} proposals and {} votes",
            snapshot.proposals.len(),
            snapshot.votes.len()
        );

        Ok(Ledger {
            config,
            clock,
            next_id: snapshot.next_id,
            proposals: snapshot.proposals,
            votes: snapshot.votes,
            events: Default::default(),
        })
    }
}

impl<C: Clock> Ledger<PublicKey, C> {
    /// Verifies the caller's signature, then executes the call as that caller.
    pub fn submit(&mut self, signed_tx: &SignedTransaction) -> Result<Receipt> {
        if let Err(err) = signed_tx.validate_signature() {
            debug!(
                "[LDG] dropping tx with bad signature from {}",
                short_hex(&signed_tx.caller)
            );
            return Err(err);
        }
        info!("[LDG] executing {:?}", signed_tx);
        self.execute(&signed_tx.caller, signed_tx.tx.call.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::sync::Arc;

    const DAY: u64 = 86_400;
    const AUTHORITY: u8 = 0;

    fn ledger(now: Timestamp) -> (Ledger<u8, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        (
            Ledger::from(LedgerConfig::new(AUTHORITY), clock.clone()),
            clock,
        )
    }

    fn create(ledger: &mut Ledger<u8, Arc<ManualClock>>) -> ProposalId {
        ledger
            .create_proposal(
                &AUTHORITY,
                "Proposal 1",
                "Description 1",
                "Category 1",
                Duration::from_secs(DAY),
            )
            .unwrap()
    }

    #[test]
    fn test_ids_are_sequential_from_one() {
        let (mut ledger, _) = ledger(1_000);
        assert_eq!(ledger.proposal_count(), 0);
        let ids: Vec<_> = (0..5).map(|_| create(&mut ledger)).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(ledger.proposal_count(), 5);
    }

    #[test]
    fn test_deadline_is_creation_time_plus_duration() {
        let (mut ledger, _) = ledger(1_000);
        let id = create(&mut ledger);
        let p = ledger.get_proposal(id).unwrap();
        assert_eq!(p.deadline, 1_000 + DAY);
        assert_eq!(p.proposer, AUTHORITY);
        assert_eq!((p.upvotes, p.downvotes, p.finalized), (0, 0, false));
    }

    #[test]
    fn test_rejected_create_leaves_no_trace() {
        let (mut ledger, _) = ledger(1_000);
        let res = ledger.create_proposal(&1, "t", "d", "c", Duration::from_secs(DAY));
        assert!(matches!(res, Err(Error::Unauthorized { .. })));

        let res = ledger.create_proposal(&AUTHORITY, "t", "d", "c", Duration::ZERO);
        assert!(matches!(res, Err(Error::InvalidArgument(_))));

        assert_eq!(ledger.proposal_count(), 0);
        assert_eq!(ledger.last_event_seq(), 0);
        assert_eq!(create(&mut ledger), 1);
    }

    #[test]
    fn test_fractional_durations_are_rejected() {
        let (mut ledger, _) = ledger(1_000);
        let res = ledger.create_proposal(&AUTHORITY, "t", "d", "c", Duration::from_millis(500));
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
        let res = ledger.create_proposal(&AUTHORITY, "t", "d", "c", Duration::from_millis(1_500));
        assert!(matches!(res, Err(Error::InvalidArgument(_))));

        // authorization is still checked first
        let res = ledger.create_proposal(&1, "t", "d", "c", Duration::from_millis(1_500));
        assert!(matches!(res, Err(Error::Unauthorized { .. })));

        assert_eq!(ledger.proposal_count(), 0);
        let id = ledger
            .create_proposal(&AUTHORITY, "t", "d", "c", Duration::from_millis(2_000))
            .unwrap();
        assert_eq!(ledger.get_proposal(id).unwrap().deadline, 1_002);
    }

    #[test]
    fn test_deadline_overflow_is_invalid() {
        let clock = ManualClock::new(u64::MAX - 10);
        let mut ledger = Ledger::from(LedgerConfig::new(AUTHORITY).unbounded(), clock);
        let res = ledger.create_proposal_at(
            &AUTHORITY,
            "t".into(),
            "d".into(),
            "c".into(),
            100,
            u64::MAX - 10,
        );
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
        assert_eq!(ledger.proposal_count(), 0);
    }

    #[test]
    fn test_vote_precondition_order() {
        let (mut ledger, clock) = ledger(0);
        assert!(matches!(
            ledger.cast_vote(&1, 1, true),
            Err(Error::NotFound(1))
        ));

        let id = create(&mut ledger);
        ledger.cast_vote(&1, id, true).unwrap();

        clock.set(DAY);
        // closed wins over duplicate
        assert!(matches!(
            ledger.cast_vote(&1, id, true),
            Err(Error::VotingClosed { .. })
        ));

        ledger.finalize(&2, id).unwrap();
        // finalized wins over closed
        assert!(matches!(
            ledger.cast_vote(&3, id, false),
            Err(Error::AlreadyFinalized(_))
        ));
    }

    #[test]
    fn test_deadline_boundaries() {
        let (mut ledger, clock) = ledger(0);
        let id = create(&mut ledger);

        clock.set(DAY - 1);
        ledger.cast_vote(&1, id, true).unwrap();
        assert!(matches!(
            ledger.finalize(&1, id),
            Err(Error::VotingStillOpen { .. })
        ));

        clock.set(DAY);
        assert!(matches!(
            ledger.cast_vote(&2, id, true),
            Err(Error::VotingClosed { .. })
        ));
        assert_eq!(ledger.finalize(&1, id).unwrap(), Outcome::Accepted);
    }

    #[test]
    fn test_second_finalize_changes_nothing() {
        let (mut ledger, clock) = ledger(0);
        let id = create(&mut ledger);
        ledger.cast_vote(&1, id, false).unwrap();
        clock.set(DAY);

        assert_eq!(ledger.finalize(&1, id).unwrap(), Outcome::Rejected);
        let before = ledger.snapshot();
        let seq = ledger.last_event_seq();

        assert!(matches!(
            ledger.finalize(&AUTHORITY, id),
            Err(Error::AlreadyFinalized(_))
        ));
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.last_event_seq(), seq);
    }

    #[test]
    fn test_events_follow_mutations() {
        let (mut ledger, clock) = ledger(0);
        let id = create(&mut ledger);
        ledger.cast_vote(&9, id, false).unwrap();
        clock.advance(DAY);
        ledger.finalize(&9, id).unwrap();

        let events = ledger.events_since(0);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0].event, Event::ProposalCreated(p) if p.id == id));
        assert_eq!(
            events[1].event,
            Event::Voted {
                proposal_id: id,
                voter: 9,
                support: false
            }
        );
        assert_eq!(
            events[2].event,
            Event::ProposalFinalized {
                proposal_id: id,
                outcome: Outcome::Rejected
            }
        );
        assert_eq!(ledger.drain_events().len(), 3);
        assert!(ledger.events_since(0).is_empty());
    }

    #[test]
    fn test_execute_dispatches_calls() {
        let (mut ledger, clock) = ledger(0);
        let receipt = ledger
            .execute(
                &AUTHORITY,
                Call::CreateProposal {
                    title: "t".into(),
                    description: "d".into(),
                    category: "c".into(),
                    duration: 10,
                },
            )
            .unwrap();
        assert_eq!(receipt, Receipt::Created(1));

        let receipt = ledger
            .execute(
                &4,
                Call::CastVote {
                    proposal_id: 1,
                    support: true,
                },
            )
            .unwrap();
        assert_eq!(
            receipt,
            Receipt::Voted {
                proposal_id: 1,
                support: true
            }
        );

        clock.set(10);
        assert_eq!(ledger.status(1).unwrap(), ProposalStatus::PendingFinalization);
        let receipt = ledger.execute(&4, Call::Finalize { proposal_id: 1 }).unwrap();
        assert_eq!(
            receipt,
            Receipt::Finalized {
                proposal_id: 1,
                outcome: Outcome::Accepted
            }
        );
        assert_eq!(ledger.status(1).unwrap(), ProposalStatus::Accepted);
    }
}
