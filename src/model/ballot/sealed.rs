use chrono::{DateTime, Utc};
use rocket::serde::json::serde_json;
use serde::{Deserialize, Serialize};

use super::{verify_commitment, Commitment, ElectionKey, Verification};
use crate::error::{Error, Result};
use crate::model::identity::PrincipalId;

/// Raw bytes as standard base64.
mod base64 {
    use data_encoding::BASE64;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}

/// A voter's choice, before encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub candidate_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Ballot {
    pub fn new(candidate_id: impl Into<String>) -> Self {
        Self::at(candidate_id, Utc::now())
    }

    pub fn at(candidate_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            timestamp,
        }
    }

    /// The plaintext that gets sealed: JSON with fields in declaration order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Encryption(e.to_string()))
    }

    pub fn encrypt(&self, key: &ElectionKey) -> Result<EncryptedBallot> {
        let plaintext = self.to_bytes()?;
        Ok(EncryptedBallot {
            ciphertext: key.seal(&plaintext)?,
        })
    }
}

/// A sealed ballot with no commitment yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBallot {
    ciphertext: Vec<u8>,
}

impl EncryptedBallot {
    /// Wrap a ciphertext sealed elsewhere, typically by the voter's client.
    pub fn from_ciphertext(ciphertext: Vec<u8>) -> Self {
        Self { ciphertext }
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn commit(self) -> CommittedBallot {
        let commitment_hash = Commitment::of(&self.ciphertext);
        CommittedBallot {
            ciphertext: self.ciphertext,
            commitment_hash,
        }
    }
}

/// A sealed ballot together with the commitment handed back to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedBallot {
    #[serde(with = "base64")]
    pub ciphertext: Vec<u8>,
    pub commitment_hash: Commitment,
}

impl CommittedBallot {
    /// Check the commitment the client claims against the one recomputed here.
    pub fn matches(&self, claimed: &Commitment) -> Verification {
        verify_commitment(&self.ciphertext, claimed)
    }

    pub fn submit_as(self, voter_id: PrincipalId) -> BallotCommitment {
        BallotCommitment {
            voter_id,
            ciphertext: self.ciphertext,
            commitment_hash: self.commitment_hash,
        }
    }
}

/// A committed ballot attributed to a voter, as held on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotCommitment {
    pub voter_id: PrincipalId,
    #[serde(with = "base64")]
    pub ciphertext: Vec<u8>,
    pub commitment_hash: Commitment,
}

impl BallotCommitment {
    pub fn ciphertext_base64(&self) -> String {
        data_encoding::BASE64.encode(&self.ciphertext)
    }

    /// Recompute the commitment over the stored ciphertext.
    pub fn verify(&self) -> Verification {
        verify_commitment(&self.ciphertext, &self.commitment_hash)
    }
}

/// Seal a vote for `candidate_id` under the PEM-encoded election key and
/// commit to the ciphertext.
pub fn encrypt_and_commit(public_key_pem: &str, candidate_id: &str) -> Result<CommittedBallot> {
    let key = ElectionKey::from_pem(public_key_pem)?;
    Ok(Ballot::new(candidate_id).encrypt(&key)?.commit())
}
