//! The permissioned ledger, reached through a gateway that runs chaincode
//! transactions on behalf of an enrolled identity.

mod chaincode;
mod gateway;
#[cfg(test)]
mod memory;

use std::sync::Arc;

pub use chaincode::{Candidate, CandidateTally, Chaincode, SeedReport};
pub use gateway::GatewayLedger;
#[cfg(test)]
pub use memory::MemoryLedger;

use crate::error::Result;
use crate::model::identity::Credential;

/// A chaincode endpoint. Failures are reported with a structured kind:
/// [`crate::error::Error::ChaincodeAlreadyExists`] for duplicate creates,
/// [`crate::error::Error::NotFound`] for missing records,
/// [`crate::error::Error::LedgerUnavailable`] when the gateway cannot be
/// reached, and [`crate::error::Error::Chaincode`] for everything else.
#[rocket::async_trait]
pub trait Ledger: Send + Sync {
    /// Run a transaction that is ordered and committed to the ledger.
    async fn submit_transaction(
        &self,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>>;

    /// Run a read-only query against the current world state.
    async fn evaluate_transaction(
        &self,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>>;
}

pub type SharedLedger = Arc<dyn Ledger>;
