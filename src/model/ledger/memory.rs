use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rocket::serde::json::serde_json::{self, json, Value};

use super::{Candidate, Ledger};
use crate::error::{Error, Result};
use crate::model::identity::Credential;

#[derive(Debug, Default)]
struct State {
    voters: HashSet<String>,
    ballots: HashMap<String, Value>,
    candidates: BTreeMap<String, Candidate>,
    tallies: HashMap<String, u64>,
}

/// An in-process ledger running the voting chaincode's rules.
#[derive(Debug)]
pub struct MemoryLedger {
    available: Mutex<bool>,
    state: Mutex<State>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn arg(args: &[String], index: usize) -> Result<&str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::Chaincode(format!("missing argument {index}")))
}

fn encode(value: Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&value)?)
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(true),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner) = available;
    }

    pub fn set_tally(&self, candidate_id: &str, votes: u64) {
        self.state().tallies.insert(candidate_id.to_string(), votes);
    }

    /// Flip a bit in the stored ciphertext for `voter`.
    pub fn tamper(&self, voter: &str) {
        let mut state = self.state();
        let Some(ballot) = state.ballots.get_mut(voter) else {
            return;
        };
        let mut ciphertext = data_encoding::BASE64
            .decode(ballot["ciphertext"].as_str().unwrap_or_default().as_bytes())
            .unwrap_or_default();
        if let Some(byte) = ciphertext.first_mut() {
            *byte ^= 1;
        }
        ballot["ciphertext"] = Value::String(data_encoding::BASE64.encode(&ciphertext));
    }

    fn check_available(&self) -> Result<()> {
        if *self.available.lock().unwrap_or_else(PoisonError::into_inner) {
            Ok(())
        } else {
            Err(Error::LedgerUnavailable("peer is down".to_string()))
        }
    }

    fn run(&self, identity: &Credential, name: &str, args: &[String]) -> Result<Vec<u8>> {
        self.check_available()?;
        let mut state = self.state();
        match name {
            "RegisterVoter" => {
                let voter = arg(args, 0)?;
                if !state.voters.insert(voter.to_string()) {
                    return Err(Error::ChaincodeAlreadyExists(format!("voter {voter}")));
                }
                Ok(vec![])
            }
            "CastVote" => {
                let voter = arg(args, 0)?;
                if identity.principal_id.as_str() != voter {
                    return Err(Error::Chaincode(format!("{voter} may only vote as itself")));
                }
                if !state.voters.contains(voter) {
                    return Err(Error::Chaincode(format!("{voter} is not registered")));
                }
                if state.ballots.contains_key(voter) {
                    return Err(Error::ChaincodeAlreadyExists(format!("ballot for {voter}")));
                }
                let ballot = json!({
                    "voterId": voter,
                    "ciphertext": arg(args, 1)?,
                    "commitmentHash": arg(args, 2)?,
                });
                state.ballots.insert(voter.to_string(), ballot);
                Ok(vec![])
            }
            "GetBallot" => {
                let voter = arg(args, 0)?;
                match state.ballots.get(voter) {
                    Some(ballot) => encode(ballot.clone()),
                    None => Err(Error::NotFound(format!("ballot for {voter}"))),
                }
            }
            "CreateCandidate" => {
                let candidate = Candidate::new(arg(args, 0)?, arg(args, 1)?, arg(args, 2)?);
                if state.candidates.contains_key(&candidate.id) {
                    return Err(Error::ChaincodeAlreadyExists(format!(
                        "candidate {}",
                        candidate.id
                    )));
                }
                state.candidates.insert(candidate.id.clone(), candidate);
                Ok(vec![])
            }
            "GetAllCandidates" => {
                let candidates: Vec<&Candidate> = state.candidates.values().collect();
                encode(json!(candidates))
            }
            "QueryResults" => {
                let id = arg(args, 0)?;
                if !state.candidates.contains_key(id) {
                    return Err(Error::NotFound(format!("candidate {id}")));
                }
                let votes = state.tallies.get(id).copied().unwrap_or(0);
                encode(json!({ "candidateID": id, "voteCount": votes }))
            }
            other => Err(Error::Chaincode(format!("unknown transaction {other}"))),
        }
    }
}

#[rocket::async_trait]
impl Ledger for MemoryLedger {
    async fn submit_transaction(
        &self,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        self.run(identity, name, args)
    }

    async fn evaluate_transaction(
        &self,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        self.run(identity, name, args)
    }
}
