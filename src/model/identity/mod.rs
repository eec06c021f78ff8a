//! The identity store: a durable mapping from principal name to the X.509
//! credential that principal uses against the ledger and the authority.

mod credential;
mod memory;
mod mongo;
mod principal;
mod wallet;

use std::sync::Arc;

pub use credential::{Credential, CredentialKind};
pub use memory::MemoryWallet;
pub use mongo::MongoWallet;
pub use principal::PrincipalId;
pub use wallet::FileSystemWallet;

use crate::error::{Error, Result};

/// Keyed credential storage.
///
/// Implementations must guarantee that at most one `put` ever succeeds for a
/// given principal, even when several race, and that a partially written
/// credential is never returned by `get`.
#[rocket::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch the credential for `principal`, failing with [`Error::NotFound`]
    /// if there is none.
    async fn get(&self, principal: &PrincipalId) -> Result<Credential>;

    /// Store a new credential, keyed by its principal. Fails with
    /// [`Error::AlreadyExists`] rather than overwriting.
    async fn put(&self, credential: Credential) -> Result<()>;

    /// Is there a credential for `principal`?
    async fn contains(&self, principal: &PrincipalId) -> Result<bool> {
        match self.get(principal).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// The identity store as held in managed state.
pub type SharedStore = Arc<dyn IdentityStore>;
