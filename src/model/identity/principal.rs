use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const MAX_LENGTH: usize = 64;

/// The name of a principal: the key into the identity store, the enrollment
/// ID at the authority, and the subject of session tokens.
///
/// Only `[A-Za-z0-9._@-]` is permitted, and the name may not start with a
/// dot, so a principal id is always safe to use as a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    /// The conventional bootstrap administrator.
    pub fn admin() -> Self {
        Self("admin".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(id: &str) -> bool {
        !id.is_empty()
            && id.len() <= MAX_LENGTH
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-'))
    }
}

impl TryFrom<String> for PrincipalId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&id) {
            Ok(Self(id))
        } else {
            Err(Error::BadRequest(format!("Invalid principal id {id:?}")))
        }
    }
}

impl FromStr for PrincipalId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Self::try_from(id.to_string())
    }
}

impl From<PrincipalId> for String {
    fn from(id: PrincipalId) -> Self {
        id.0
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PrincipalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
