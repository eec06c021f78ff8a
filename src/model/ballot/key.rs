use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;

use rsa::{
    pkcs1::DecodeRsaPublicKey, pkcs8::DecodePublicKey, traits::PublicKeyParts, Oaep, RsaPublicKey,
};
use sha2::Sha256;

use crate::error::{Error, Result};

/// Smallest modulus accepted for an election key.
pub const MIN_KEY_BITS: usize = 2048;

/// The election's published RSA public key. Ballots are sealed under it
/// with OAEP-SHA256 and only the election authority can open them.
#[derive(Clone, PartialEq, Eq)]
pub struct ElectionKey {
    key: RsaPublicKey,
    pem: String,
}

impl ElectionKey {
    /// Parse an SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| Error::Encryption(format!("Unreadable public key: {e}")))?;
        let bits = key.size() * 8;
        if bits < MIN_KEY_BITS {
            return Err(Error::Encryption(format!(
                "{bits}-bit key is too weak, at least {MIN_KEY_BITS} bits are required"
            )));
        }
        Ok(Self {
            key,
            pem: pem.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let pem = fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    /// Encrypt `plaintext` with fresh OAEP randomness.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.key
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))
    }
}

impl Debug for ElectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ElectionKey({} bits)", self.bits())
    }
}


#[cfg(test)]
mod tests {
    use super::examples::*;
    use super::*;

    #[test]
    fn seal_then_open() {
        let key = ElectionKey::example();
        assert_eq!(2048, key.bits());
        let ciphertext = key.seal(b"candidate").unwrap();
        assert_eq!(256, ciphertext.len());
        assert_eq!(b"candidate".to_vec(), open(&ciphertext));
    }

    #[test]
    fn sealing_is_randomized() {
        let key = ElectionKey::example();
        assert_ne!(key.seal(b"C1").unwrap(), key.seal(b"C1").unwrap());
    }

    #[test]
    fn weak_keys_are_rejected() {
        let result = ElectionKey::from_pem(WEAK_PUBLIC_PEM);
        assert!(matches!(result, Err(Error::Encryption(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let result = ElectionKey::from_pem("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----\n");
        assert!(matches!(result, Err(Error::Encryption(_))));
        assert!(matches!(ElectionKey::from_pem(""), Err(Error::Encryption(_))));
    }

    #[test]
    fn oversized_plaintext_fails() {
        // OAEP-SHA256 under a 2048-bit key fits at most 190 bytes.
        let result = ElectionKey::example().seal(&[0; 191]);
        assert!(matches!(result, Err(Error::Encryption(_))));
    }
}
