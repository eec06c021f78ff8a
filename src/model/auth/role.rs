use std::fmt::Display;
use std::str::FromStr;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::Error;

/// Privilege classes. A principal's role is fixed when its session token is
/// issued and can only change through re-authentication.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Role {
    Voter = 0,
    Admin = 1,
    Auditor = 2,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Voter, Role::Admin, Role::Auditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Admin => "admin",
            Self::Auditor => "auditor",
        }
    }

    /// The identity type the authority registers this role under.
    pub fn identity_type(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Voter | Self::Auditor => "client",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == role)
            .ok_or_else(|| Error::BadRequest(format!("Unknown role {role:?}")))
    }
}
