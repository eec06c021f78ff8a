use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

use super::PrincipalId;

/// The only credential format the ledger accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialKind {
    #[serde(rename = "X.509")]
    X509,
}

/// A principal's certificate and private key, plus the organization (MSP)
/// that vouches for it. Owned by the identity store and never sent to a client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub principal_id: PrincipalId,
    /// PEM-encoded certificate issued by the authority.
    pub certificate: String,
    /// PEM-encoded private key matching `certificate`.
    pub private_key: String,
    pub organization_id: String,
    pub kind: CredentialKind,
}

impl Credential {
    pub fn x509(
        principal_id: PrincipalId,
        certificate: String,
        private_key: String,
        organization_id: String,
    ) -> Self {
        Self {
            principal_id,
            certificate,
            private_key,
            organization_id,
            kind: CredentialKind::X509,
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("principal_id", &self.principal_id)
            .field("organization_id", &self.organization_id)
            .field("kind", &self.kind)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}
