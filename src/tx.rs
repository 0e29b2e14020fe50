use core::fmt::{self, Debug};

use blsttc::{PublicKey, SecretKey, Signature};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::{Error, Outcome, ProposalId, Result};

/// A mutating request as it arrives at the submission boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    CreateProposal {
        title: String,
        description: String,
        category: String,
        /// seconds
        duration: u64,
    },
    CastVote {
        proposal_id: ProposalId,
        support: bool,
    },
    Finalize {
        proposal_id: ProposalId,
    },
}

/// What a successfully executed [`Call`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receipt {
    Created(ProposalId),
    Voted {
        proposal_id: ProposalId,
        support: bool,
    },
    Finalized {
        proposal_id: ProposalId,
        outcome: Outcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Lets a caller sign the same call twice with distinct signatures.
    /// Deduplicating by nonce is left to whoever sequences transactions.
    pub nonce: u64,
    pub call: Call,
}

impl Transaction {
    pub fn new(nonce: u64, call: Call) -> Self {
        Self { nonce, call }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self)?)
    }

    pub fn sign(self, secret_key: &SecretKey) -> Result<SignedTransaction> {
        Ok(SignedTransaction {
            sig: secret_key.sign(&self.to_bytes()?),
            caller: secret_key.public_key(),
            tx: self,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub caller: PublicKey,
    pub sig: Signature,
}

impl Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}#{}@{}",
            self.tx.call,
            self.tx.nonce,
            short_hex(&self.caller)
        )
    }
}

impl SignedTransaction {
    pub fn validate_signature(&self) -> Result<()> {
        if self.caller.verify(&self.sig, &self.tx.to_bytes()?) {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }
}

/// Fresh signing key for a caller at the submission boundary.
pub fn random_secret_key(mut rng: impl Rng + CryptoRng) -> SecretKey {
    rng.gen()
}

/// First four bytes of a public key, hex encoded. Enough to tell callers apart in logs.
pub fn short_hex(public_key: &PublicKey) -> String {
    hex::encode(&public_key.to_bytes()[..4])
}
