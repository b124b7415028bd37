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
pub mod model;
pub mod store;

pub use config::Config;

/// Build the server. Configuration and the database connection are loaded at ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

/// Build a server over the given store instead of connecting to MongoDB.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: store::SharedStore) -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .manage(store)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}
