use std::fs;
use std::io::{self, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use rocket::serde::json::serde_json;
use rocket::tokio::task;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{Credential, CredentialKind, IdentityStore, PrincipalId};
use crate::error::{Error, Result};

const ENTRY_EXTENSION: &str = "id";
const WALLET_VERSION: u32 = 1;

/// An identity store backed by a directory of `<principal>.id` JSON files,
/// laid out the same way as a Fabric file-system wallet.
#[derive(Debug, Clone)]
pub struct FileSystemWallet {
    dir: PathBuf,
}

impl FileSystemWallet {
    /// Open (creating if necessary) the wallet rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!("Opened file-system wallet at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, principal: &PrincipalId) -> PathBuf {
        self.dir.join(format!("{principal}.{ENTRY_EXTENSION}"))
    }
}

/// On-disk wallet entry.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletEntry {
    credentials: WalletCredentials,
    msp_id: String,
    #[serde(rename = "type")]
    kind: CredentialKind,
    version: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletCredentials {
    certificate: String,
    private_key: String,
}

impl WalletEntry {
    fn into_credential(self, principal_id: PrincipalId) -> Credential {
        Credential {
            principal_id,
            certificate: self.credentials.certificate,
            private_key: self.credentials.private_key,
            organization_id: self.msp_id,
            kind: self.kind,
        }
    }
}

impl From<Credential> for WalletEntry {
    fn from(credential: Credential) -> Self {
        Self {
            credentials: WalletCredentials {
                certificate: credential.certificate,
                private_key: credential.private_key,
            },
            msp_id: credential.organization_id,
            kind: credential.kind,
            version: WALLET_VERSION,
        }
    }
}

/// Stage `bytes` in a temp file inside `dir` and move it to `target` only if
/// nothing is there yet. Staging names start with a dot, which no principal id
/// may, and the temp file is deleted on every failure path.
fn publish_exclusive(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist_noclobber(target).map_err(|e| e.error)?;
    Ok(())
}

/// Run blocking file-system work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Storage(io::Error::new(IoErrorKind::Other, e)))?
}

#[rocket::async_trait]
impl IdentityStore for FileSystemWallet {
    async fn get(&self, principal: &PrincipalId) -> Result<Credential> {
        let path = self.entry_path(principal);
        let principal = principal.clone();
        blocking(move || {
            let contents = match fs::read(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == IoErrorKind::NotFound => {
                    return Err(Error::NotFound(format!("No credential for {principal}")));
                }
                Err(e) => return Err(e.into()),
            };
            let entry: WalletEntry = serde_json::from_slice(&contents)?;
            Ok(entry.into_credential(principal))
        })
        .await
    }

    async fn put(&self, credential: Credential) -> Result<()> {
        let principal = credential.principal_id.clone();
        let target = self.entry_path(&principal);
        let dir = self.dir.clone();
        let bytes = serde_json::to_vec(&WalletEntry::from(credential))?;
        blocking(move || match publish_exclusive(&dir, &target, &bytes) {
            Ok(()) => {
                debug!("Stored credential for {principal}");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(principal.to_string()))
            }
            Err(e) => Err(e.into()),
        })
        .await
    }
}
