//! Wiring for route tests: the real routes and guards, backed by a wallet in a
//! scratch directory and in-process stand-ins for the authority and ledger.

use std::path::Path;
use std::sync::Arc;

use rocket::{figment::Figment, local::asynchronous::Client, Build, Rocket};

use crate::api;
use crate::config::Config;
use crate::logging::LoggerFairing;
use crate::model::{
    auth::{Role, SessionAuthenticator},
    authority::{AuthoritySettings, Bootstrap, CredentialAuthority, FakeAuthority},
    ballot::ElectionKey,
    identity::{Credential, FileSystemWallet, SharedStore},
    ledger::{Chaincode, MemoryLedger},
};

pub struct Harness {
    pub config: Config,
    pub wallet: Arc<FileSystemWallet>,
    pub ca: Arc<FakeAuthority>,
    pub ledger: Arc<MemoryLedger>,
}

impl Harness {
    pub fn new(dir: &Path) -> Self {
        Self {
            config: Config::example(),
            wallet: Arc::new(FileSystemWallet::open(dir).unwrap()),
            ca: Arc::new(FakeAuthority::new()),
            ledger: Arc::new(MemoryLedger::new()),
        }
    }

    pub fn store(&self) -> SharedStore {
        self.wallet.clone()
    }

    /// A credential authority over this harness's wallet and fake CA.
    pub fn authority(&self) -> CredentialAuthority {
        CredentialAuthority::new(self.store(), self.ca.clone(), AuthoritySettings::example())
    }

    pub fn sessions(&self) -> SessionAuthenticator {
        SessionAuthenticator::from_config(&self.config, self.store())
    }

    /// A rocket with strict sessions, optionally with the administrator
    /// already enrolled.
    pub async fn rocket(&self, enroll_admin: bool) -> Rocket<Build> {
        self.rocket_with(self.config.clone(), enroll_admin).await
    }

    async fn rocket_with(&self, config: Config, enroll_admin: bool) -> Rocket<Build> {
        let authority = self.authority();
        let bootstrap = if enroll_admin {
            authority.bootstrap().await
        } else {
            Bootstrap::Degraded("Administrator not enrolled".to_string())
        };
        let sessions = SessionAuthenticator::from_config(&config, self.store());
        let chaincode = Chaincode::new(self.ledger.clone(), config.network_timeout());
        let figment = Figment::from(rocket::Config::debug_default()).merge(("log_level", "off"));

        rocket::custom(figment)
            .mount("/api", api::routes())
            .register("/", api::catchers())
            .attach(LoggerFairing)
            .manage(config)
            .manage(ElectionKey::example())
            .manage(self.store())
            .manage(sessions)
            .manage(authority)
            .manage(bootstrap)
            .manage(chaincode)
    }

    /// A second client whose sessions skip the identity store check. The
    /// administrator is not enrolled.
    pub async fn lenient_client(&self) -> Client {
        let rocket = self.rocket_with(Config::lenient_example(), false).await;
        Client::tracked(rocket).await.unwrap()
    }

    /// An `Authorization` header value for `principal`.
    pub fn bearer(&self, principal: &str, role: Role) -> String {
        let token = self
            .sessions()
            .issue(&principal.parse().unwrap(), role)
            .unwrap();
        format!("Bearer {token}")
    }

    /// Enroll `principal` directly, bypassing the routes.
    pub async fn enroll(&self, principal: &str, role: Role) -> Credential {
        self.authority()
            .register_and_enroll(&principal.parse().unwrap(), role)
            .await
            .unwrap()
    }
}
