use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::model::{
    auth::SessionAuthenticator,
    authority::{AuthoritySettings, CredentialAuthority, EnrollmentSecret, FabricCaClient},
    ballot::ElectionKey,
    identity::{FileSystemWallet, MongoWallet, PrincipalId, SharedStore},
    ledger::{Chaincode, GatewayLedger},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default)]
    strict_auth: bool,
    #[serde(default = "default_network_timeout")]
    network_timeout_ms: u64,
    #[serde(default)]
    election_public_key_path: Option<PathBuf>,
    // secrets
    jwt_secret: String,
}

fn default_network_timeout() -> u64 {
    10_000
}

impl Config {
    /// Valid lifetime of session tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Whether session verification also requires the principal to hold a
    /// credential in the identity store.
    pub fn strict_auth(&self) -> bool {
        self.strict_auth
    }

    /// Limit on any single call to the authority or the ledger.
    pub fn network_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.network_timeout_ms)
    }

    /// Where the election public key PEM lives, if one is published.
    pub fn election_public_key_path(&self) -> Option<&Path> {
        self.election_public_key_path.as_deref()
    }

    /// Secret key used to sign session tokens.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// Extract one section of configuration, reporting failure the way Rocket does.
fn extract<T: DeserializeOwned>(rocket: &Rocket<Build>, what: &str) -> Option<T> {
    match rocket.figment().extract::<T>() {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Failed to load {what} config");
            rocket::config::pretty_print_error(e);
            None
        }
    }
}

/// A fairing that loads the application config, and the election key if one
/// is configured, and puts them in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<Config>(&rocket, "application") else {
            return Err(rocket);
        };

        match config.election_public_key_path() {
            Some(path) => match ElectionKey::load(path) {
                Ok(key) => {
                    info!("Loaded {}-bit election key from {}", key.bits(), path.display());
                    rocket = rocket.manage(key);
                }
                Err(e) => {
                    error!("Failed to load election key from {}: {e}", path.display());
                    return Err(rocket);
                }
            },
            None => warn!("No election public key configured"),
        }

        Ok(rocket.manage(config))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreKind {
    #[default]
    Filesystem,
    Mongodb,
}

/// Configuration for the identity store.
#[derive(Debug, Deserialize)]
struct StoreConfig {
    #[serde(default)]
    identity_store: StoreKind,
    #[serde(default = "default_wallet_path")]
    wallet_path: PathBuf,
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: Option<String>,
}

fn default_wallet_path() -> PathBuf {
    PathBuf::from("wallet")
}

fn default_db_name() -> String {
    "chainvote".to_string()
}

/// A fairing that opens the configured identity store and places it into
/// managed state as a [`SharedStore`].
pub struct IdentityStoreFairing;

#[rocket::async_trait]
impl Fairing for IdentityStoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Identity store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<StoreConfig>(&rocket, "identity store") else {
            return Err(rocket);
        };

        let store: SharedStore = match config.identity_store {
            StoreKind::Filesystem => match FileSystemWallet::open(&config.wallet_path) {
                Ok(wallet) => {
                    info!("Using wallet at {}", config.wallet_path.display());
                    Arc::new(wallet)
                }
                Err(e) => {
                    error!("Failed to open wallet: {e}");
                    return Err(rocket);
                }
            },
            StoreKind::Mongodb => {
                let Some(uri) = config.db_uri.as_deref() else {
                    error!("`db_uri` must be set to use the mongodb identity store");
                    return Err(rocket);
                };
                info!("Connecting to identity database...");
                match MongoWallet::connect(uri, &config.db_name).await {
                    Ok(wallet) => {
                        info!("...identity database online!");
                        Arc::new(wallet)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        Ok(rocket.manage(store))
    }
}

/// A fairing that builds the [`SessionAuthenticator`] from the application
/// config and identity store. Must be attached after both.
pub struct SessionFairing;

#[rocket::async_trait]
impl Fairing for SessionFairing {
    fn info(&self) -> Info {
        Info {
            name: "Sessions",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (Some(config), Some(store)) = (rocket.state::<Config>(), rocket.state::<SharedStore>())
        else {
            error!("Sessions need the application config and identity store");
            return Err(rocket);
        };
        let sessions = SessionAuthenticator::from_config(config, store.clone());
        if sessions.is_strict() {
            info!("Session tokens are checked against the identity store");
        }
        Ok(rocket.manage(sessions))
    }
}

/// Configuration for the credential authority.
#[derive(Debug, Deserialize)]
struct AuthorityConfig {
    // non-secrets
    ca_url: String,
    #[serde(default = "default_admin_id")]
    admin_id: PrincipalId,
    msp_id: String,
    #[serde(default)]
    affiliation: String,
    // secrets
    admin_secret: String,
}

fn default_admin_id() -> PrincipalId {
    PrincipalId::admin()
}

/// A fairing that connects to the credential authority and enrolls the
/// administrator, placing the [`CredentialAuthority`] and the resulting
/// [`crate::model::authority::Bootstrap`] into managed state.
///
/// An enrollment failure does not stop launch; the server starts degraded.
pub struct AuthorityFairing;

#[rocket::async_trait]
impl Fairing for AuthorityFairing {
    fn info(&self) -> Info {
        Info {
            name: "Credential authority",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<AuthorityConfig>(&rocket, "credential authority") else {
            return Err(rocket);
        };
        let (Some(app), Some(store)) = (rocket.state::<Config>(), rocket.state::<SharedStore>())
        else {
            error!("The credential authority needs the application config and identity store");
            return Err(rocket);
        };

        let timeout = app.network_timeout();
        let client = match FabricCaClient::new(&config.ca_url, timeout) {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to build authority client: {e}");
                return Err(rocket);
            }
        };
        let settings = AuthoritySettings {
            admin_id: config.admin_id,
            admin_secret: EnrollmentSecret::new(config.admin_secret),
            msp_id: config.msp_id,
            affiliation: config.affiliation,
            timeout,
        };
        let authority = CredentialAuthority::new(store.clone(), Arc::new(client), settings);

        info!("Enrolling administrator with {}...", config.ca_url);
        let bootstrap = authority.bootstrap().await;
        Ok(rocket.manage(authority).manage(bootstrap))
    }
}

/// Configuration for the ledger gateway.
#[derive(Debug, Deserialize)]
struct LedgerConfig {
    ledger_url: String,
    channel_name: String,
    chaincode_name: String,
}

/// A fairing that places a [`Chaincode`] for the configured gateway into
/// managed state. The gateway is not contacted until first use.
pub struct LedgerFairing;

#[rocket::async_trait]
impl Fairing for LedgerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ledger",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<LedgerConfig>(&rocket, "ledger") else {
            return Err(rocket);
        };
        let Some(timeout) = rocket.state::<Config>().map(Config::network_timeout) else {
            error!("The ledger needs the application config");
            return Err(rocket);
        };

        let gateway = match GatewayLedger::new(
            &config.ledger_url,
            &config.channel_name,
            &config.chaincode_name,
            timeout,
        ) {
            Ok(gateway) => gateway,
            Err(e) => {
                error!("Failed to build ledger client: {e}");
                return Err(rocket);
            }
        };
        info!(
            "Using chaincode {} on channel {} via {}",
            config.chaincode_name, config.channel_name, config.ledger_url
        );
        Ok(rocket.manage(Chaincode::new(Arc::new(gateway), timeout)))
    }
}
