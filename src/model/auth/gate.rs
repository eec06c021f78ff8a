use super::{AuthContext, Role};
use crate::error::{Error, Result};

/// A fixed set of roles allowed to perform some operation.
pub trait Permission {
    const ROLES: &'static [Role];
}

/// Election administrators.
pub enum AdminOnly {}

impl Permission for AdminOnly {
    const ROLES: &'static [Role] = &[Role::Admin];
}

/// Voters casting or checking their own ballot.
pub enum VoterOnly {}

impl Permission for VoterOnly {
    const ROLES: &'static [Role] = &[Role::Voter];
}

/// Anyone entitled to see the tally.
pub enum Tallier {}

impl Permission for Tallier {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Auditor];
}

/// Any authenticated principal.
pub enum AnyRole {}

impl Permission for AnyRole {
    const ROLES: &'static [Role] = &Role::ALL;
}

/// Check that `context` holds one of `allowed`.
///
/// Failure is [`Error::Forbidden`]: the session itself is valid.
pub fn require(context: &AuthContext, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&context.role) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "{} ({}) may not perform this operation",
            context.principal, context.role
        )))
    }
}
