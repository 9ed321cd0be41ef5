#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod model;
pub mod store;

pub use config::Config;

/// Build the server, backed by MongoDB.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .mount(api::MOUNT, api::routes())
        .register("/", api::catchers())
}

/// Build a server over an in-memory store, for tests.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: store::MemoryStore) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("auth_ttl", 3600))
        .merge(("jwt_secret", "test-jwt-secret"));

    rocket::custom(figment)
        .attach(ConfigFairing)
        .manage(store::Store::new(store))
        .mount(api::MOUNT, api::routes())
        .mount("/", api::testing::routes())
        .register("/", api::catchers())
}
