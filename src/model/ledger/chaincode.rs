use std::time::Duration;

use log::{debug, info};
use rocket::serde::json::serde_json;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::SharedLedger;
use crate::error::{Error, Result};
use crate::model::ballot::BallotCommitment;
use crate::model::deadline::with_timeout;
use crate::model::identity::{Credential, PrincipalId};

const PEER: &str = "ledger";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "candidateID")]
    pub id: String,
    pub name: String,
    pub party: String,
}

impl Candidate {
    pub fn new(id: &str, name: &str, party: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            party: party.to_string(),
        }
    }

    /// The roll seeded into a fresh ledger.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("1", "Alice Johnson", "Democratic Party"),
            Self::new("2", "Bob Smith", "Republican Party"),
            Self::new("3", "Carol Davis", "Independent"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    #[serde(rename = "candidateID")]
    pub candidate_id: String,
    pub vote_count: u64,
}

/// Which candidates a seeding run created and which were already there.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

/// Typed access to the voting chaincode.
pub struct Chaincode {
    ledger: SharedLedger,
    timeout: Duration,
}

impl Chaincode {
    pub fn new(ledger: SharedLedger, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }

    async fn submit(&self, identity: &Credential, name: &str, args: Vec<String>) -> Result<()> {
        debug!("{} submitting {name}", identity.principal_id);
        with_timeout(
            PEER,
            self.timeout,
            self.ledger.submit_transaction(identity, name, &args),
        )
        .await?;
        Ok(())
    }

    async fn evaluate<T: DeserializeOwned>(
        &self,
        identity: &Credential,
        name: &str,
        args: Vec<String>,
    ) -> Result<T> {
        let bytes = with_timeout(
            PEER,
            self.timeout,
            self.ledger.evaluate_transaction(identity, name, &args),
        )
        .await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Chaincode(format!("Malformed {name} result: {e}")))
    }

    /// Record `voter` as eligible. A voter already on the roll is fine.
    pub async fn register_voter(&self, admin: &Credential, voter: &PrincipalId) -> Result<()> {
        match self
            .submit(admin, "RegisterVoter", vec![voter.to_string()])
            .await
        {
            Err(Error::ChaincodeAlreadyExists(_)) => {
                info!("Voter {voter} already on the ledger");
                Ok(())
            }
            other => other,
        }
    }

    /// Submit a ballot using the voter's own identity. A second ballot from
    /// the same voter fails with [`Error::ChaincodeAlreadyExists`].
    pub async fn cast_vote(&self, voter: &Credential, ballot: &BallotCommitment) -> Result<()> {
        let args = vec![
            ballot.voter_id.to_string(),
            ballot.ciphertext_base64(),
            ballot.commitment_hash.to_hex(),
        ];
        self.submit(voter, "CastVote", args).await
    }

    pub async fn ballot(&self, identity: &Credential, voter: &PrincipalId) -> Result<BallotCommitment> {
        self.evaluate(identity, "GetBallot", vec![voter.to_string()])
            .await
    }

    pub async fn create_candidate(&self, admin: &Credential, candidate: &Candidate) -> Result<()> {
        let args = vec![
            candidate.id.clone(),
            candidate.name.clone(),
            candidate.party.clone(),
        ];
        self.submit(admin, "CreateCandidate", args).await
    }

    /// Create each candidate, counting ones the ledger already holds as done.
    pub async fn seed_candidates(
        &self,
        admin: &Credential,
        candidates: &[Candidate],
    ) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        for candidate in candidates {
            match self.create_candidate(admin, candidate).await {
                Ok(()) => report.created.push(candidate.id.clone()),
                Err(Error::ChaincodeAlreadyExists(_)) => report.existing.push(candidate.id.clone()),
                Err(e) => return Err(e),
            }
        }
        info!(
            "Seeded candidates: {} created, {} already present",
            report.created.len(),
            report.existing.len()
        );
        Ok(report)
    }

    pub async fn candidates(&self, identity: &Credential) -> Result<Vec<Candidate>> {
        self.evaluate(identity, "GetAllCandidates", vec![]).await
    }

    pub async fn results(&self, identity: &Credential, candidate_id: &str) -> Result<CandidateTally> {
        self.evaluate(identity, "QueryResults", vec![candidate_id.to_string()])
            .await
    }
}
