use std::sync::Arc;

use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::store::{ensure_indexes_exist, MongoStore, SharedStore};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_search_page_size")]
    search_page_size: u64,
    #[serde(default = "default_list_page_size")]
    list_page_size: u64,
    #[serde(default = "default_max_page_size")]
    max_page_size: u64,
}

fn default_search_page_size() -> u64 {
    30
}

fn default_list_page_size() -> u64 {
    100
}

fn default_max_page_size() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_page_size: default_search_page_size(),
            list_page_size: default_list_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Config {
    /// Page size of `/search` when no `limit` is given.
    pub fn search_page_size(&self) -> u64 {
        self.search_page_size
    }

    /// Page size of the bulk `/voters` listing when no `limit` is given.
    pub fn list_page_size(&self) -> u64 {
        self.list_page_size
    }

    /// Upper bound on any requested `limit`.
    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with [`DatabaseFairing`] and control over error
/// messages.
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
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "kerala_voters".to_string()
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the voter indexes exist, and places the voter store into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online, using {}", config.db_name);

        // Manage the state.
        let store: SharedStore = Arc::new(MongoStore::new(&db));
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}
