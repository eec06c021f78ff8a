//! Issuing credentials through the external certificate authority.

mod client;
mod enrollment;
#[cfg(test)]
mod fake;
mod service;

pub use client::{
    Attribute, CertificateAuthority, EnrollmentSecret, FabricCaClient, IssuedCertificate,
    RegistrationRequest,
};
pub use enrollment::Enrollment;
#[cfg(test)]
pub use fake::{Behaviour, FakeAuthority};
pub use service::{AuthoritySettings, Bootstrap, CredentialAuthority};
