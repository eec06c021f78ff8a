use std::collections::{hash_map::Entry, HashMap};
use std::sync::{Mutex, PoisonError};

use super::{Credential, IdentityStore, PrincipalId};
use crate::error::{Error, Result};

/// An identity store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryWallet {
    entries: Mutex<HashMap<PrincipalId, Credential>>,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl IdentityStore for MemoryWallet {
    async fn get(&self, principal: &PrincipalId) -> Result<Credential> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(principal)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No credential for {principal}")))
    }

    async fn put(&self, credential: Credential) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(credential.principal_id.clone()) {
            Entry::Occupied(entry) => Err(Error::AlreadyExists(entry.key().to_string())),
            Entry::Vacant(entry) => {
                entry.insert(credential);
                Ok(())
            }
        }
    }
}
