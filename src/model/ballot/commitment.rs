use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// SHA-256 over the exact ciphertext bytes submitted to the ledger.
///
/// Serialized as 64 lowercase hex characters.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Commitment([u8; 32]);

impl Commitment {
    pub fn of(ciphertext: &[u8]) -> Self {
        let digest = Sha256::digest(ciphertext);
        let mut bytes = [0; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl Display for Commitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for Commitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Commitment({self})")
    }
}

impl FromStr for Commitment {
    type Err = Error;

    fn from_str(hex: &str) -> Result<Self> {
        let bytes = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| Error::BadRequest(format!("Commitment is not hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::BadRequest("Commitment must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Commitment {
    type Error = Error;

    fn try_from(hex: String) -> Result<Self> {
        hex.parse()
    }
}

impl From<Commitment> for String {
    fn from(commitment: Commitment) -> Self {
        commitment.to_hex()
    }
}

/// Outcome of recomputing a commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch { recomputed: Commitment },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    /// A mismatch becomes [`Error::IntegrityMismatch`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Match => Ok(()),
            Self::Mismatch { recomputed } => {
                log::warn!("Commitment mismatch, ciphertext hashes to {recomputed}");
                Err(Error::IntegrityMismatch)
            }
        }
    }
}

/// Recompute the commitment over `ciphertext` and compare it with `claimed`.
pub fn verify_commitment(ciphertext: &[u8], claimed: &Commitment) -> Verification {
    let recomputed = Commitment::of(ciphertext);
    if recomputed == *claimed {
        Verification::Match
    } else {
        Verification::Mismatch { recomputed }
    }
}
