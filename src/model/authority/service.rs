use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info};
use rocket::tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use serde::Serialize;

use super::{
    Attribute, CertificateAuthority, Enrollment, EnrollmentSecret, IssuedCertificate,
    RegistrationRequest,
};
use crate::error::{Error, Result};
use crate::model::auth::{require, AdminOnly, AuthContext, Permission, Role};
use crate::model::deadline::with_timeout;
use crate::model::identity::{Credential, PrincipalId, SharedStore};

const PEER: &str = "credential authority";

/// Outcome of enrolling the administrator at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Bootstrap {
    Ready,
    /// The server runs, but nothing needing the administrator will work.
    Degraded(String),
}

/// Fixed parameters for talking to the authority.
#[derive(Debug, Clone)]
pub struct AuthoritySettings {
    pub admin_id: PrincipalId,
    pub admin_secret: EnrollmentSecret,
    pub msp_id: String,
    pub affiliation: String,
    pub timeout: Duration,
}

/// Issues credentials to principals, keeping the identity store in step with
/// the external authority.
pub struct CredentialAuthority {
    store: SharedStore,
    ca: Arc<dyn CertificateAuthority>,
    settings: AuthoritySettings,
    in_flight: Mutex<HashMap<PrincipalId, Arc<AsyncMutex<()>>>>,
}

/// Exclusive right to register one principal. The map entry is removed by
/// whichever holder drops last.
struct PrincipalLock<'a> {
    in_flight: &'a Mutex<HashMap<PrincipalId, Arc<AsyncMutex<()>>>>,
    principal: PrincipalId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PrincipalLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = in_flight.get(&self.principal) {
            // Only the map's own handle left, so nobody is waiting.
            if Arc::strong_count(lock) == 1 {
                in_flight.remove(&self.principal);
            }
        }
    }
}

impl CredentialAuthority {
    pub fn new(
        store: SharedStore,
        ca: Arc<dyn CertificateAuthority>,
        settings: AuthoritySettings,
    ) -> Self {
        Self {
            store,
            ca,
            settings,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn admin_id(&self) -> &PrincipalId {
        &self.settings.admin_id
    }

    async fn call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        with_timeout(PEER, self.settings.timeout, call).await
    }

    fn credential(&self, principal: PrincipalId, issued: IssuedCertificate) -> Credential {
        Credential::x509(
            principal,
            issued.certificate,
            issued.private_key,
            self.settings.msp_id.clone(),
        )
    }

    /// Enroll the administrator using the bootstrap secret, unless the store
    /// already holds its credential.
    pub async fn enroll_admin(&self) -> Result<()> {
        let admin = &self.settings.admin_id;
        if self.store.contains(admin).await? {
            info!("Administrator {admin} already enrolled");
            return Ok(());
        }

        let issued = self
            .call(self.ca.enroll(admin, &self.settings.admin_secret))
            .await?;
        match self.store.put(self.credential(admin.clone(), issued)).await {
            Ok(()) => {
                info!("Enrolled administrator {admin}");
                Ok(())
            }
            Err(Error::AlreadyExists(_)) => {
                debug!("Administrator {admin} was enrolled concurrently");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run [`Self::enroll_admin`], recording rather than propagating failure.
    pub async fn bootstrap(&self) -> Bootstrap {
        match self.enroll_admin().await {
            Ok(()) => Bootstrap::Ready,
            Err(e) => {
                error!("Administrator enrollment failed: {e}");
                Bootstrap::Degraded(e.to_string())
            }
        }
    }

    pub async fn admin_credential(&self) -> Result<Credential> {
        match self.store.get(&self.settings.admin_id).await {
            Err(Error::NotFound(_)) => Err(Error::AdminNotEnrolled),
            other => other,
        }
    }

    pub async fn credential_for(&self, principal: &PrincipalId) -> Result<Credential> {
        self.store.get(principal).await
    }

    /// Wait until no other registration of `principal` is in flight.
    async fn lock(&self, principal: &PrincipalId) -> PrincipalLock<'_> {
        let lock = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(principal.clone())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        PrincipalLock {
            in_flight: &self.in_flight,
            principal: principal.clone(),
            guard: Some(guard),
        }
    }

    fn registration_request(&self, principal: &PrincipalId, role: Role) -> RegistrationRequest {
        RegistrationRequest {
            enrollment_id: principal.clone(),
            affiliation: self.settings.affiliation.clone(),
            identity_type: role.identity_type().to_string(),
            attrs: vec![Attribute {
                name: "role".to_string(),
                value: role.to_string(),
                ecert: true,
            }],
        }
    }

    /// Register `principal` with the authority on the administrator's behalf,
    /// enroll it, and store the resulting credential.
    ///
    /// The credential is stored only once both steps have succeeded.
    /// Registrations of the same principal run one at a time, and a principal
    /// already in the store fails with [`Error::AlreadyRegistered`].
    pub async fn register_and_enroll(
        &self,
        principal: &PrincipalId,
        role: Role,
    ) -> Result<Credential> {
        let admin = self.admin_credential().await?;
        let _lock = self.lock(principal).await;
        if self.store.contains(principal).await? {
            return Err(Error::AlreadyRegistered(principal.to_string()));
        }

        let mut state = Enrollment::Unregistered;
        let credential = loop {
            state = match state {
                Enrollment::Unregistered => {
                    let request = self.registration_request(principal, role);
                    let secret = self.call(self.ca.register(&request, &admin)).await?;
                    Enrollment::Registered(secret)
                }
                Enrollment::Registered(secret) => {
                    let issued = self.call(self.ca.enroll(principal, &secret)).await?;
                    Enrollment::Enrolled(self.credential(principal.clone(), issued))
                }
                Enrollment::Enrolled(credential) => break credential,
            };
            debug!("{principal} is {state}");
        };

        match self.store.put(credential.clone()).await {
            Ok(()) => {
                info!("Enrolled {principal} as {role}");
                Ok(credential)
            }
            Err(Error::AlreadyExists(id)) => Err(Error::AlreadyRegistered(id)),
            Err(e) => Err(e),
        }
    }

    /// Register a voter, on behalf of an authenticated administrator.
    pub async fn register_voter(
        &self,
        context: &AuthContext,
        voter: &PrincipalId,
    ) -> Result<Credential> {
        require(context, AdminOnly::ROLES)?;
        self.register_and_enroll(voter, Role::Voter).await
    }
}
