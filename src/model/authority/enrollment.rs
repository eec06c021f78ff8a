use std::fmt::{Display, Formatter};

use super::EnrollmentSecret;
use crate::model::identity::Credential;

/// Progress of one register-then-enroll attempt.
///
/// Nothing reaches the identity store until `Enrolled`, so an attempt that
/// dies part-way leaves the principal `Unregistered` locally and a fresh
/// attempt simply starts over.
#[derive(Debug)]
pub enum Enrollment {
    Unregistered,
    Registered(EnrollmentSecret),
    Enrolled(Credential),
}

impl Display for Enrollment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unregistered => "unregistered",
            Self::Registered(_) => "registered",
            Self::Enrolled(_) => "enrolled",
        })
    }
}
