#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

#[cfg(test)]
mod harness;

pub use config::Config;

use config::{AuthorityFairing, ConfigFairing, IdentityStoreFairing, LedgerFairing, SessionFairing};
use logging::LoggerFairing;

/// Assemble the server. Every external dependency is wired up by a fairing at
/// ignite time, in the order the later ones need them.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(IdentityStoreFairing)
        .attach(SessionFairing)
        .attach(AuthorityFairing)
        .attach(LedgerFairing)
}
