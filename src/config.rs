use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::store::{MongoStore, Store};

/// Name of the database holding elections, ballots and registrations.
const DATABASE_NAME: &str = "elections";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to verify JWTs issued by the identity service.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// creates the indexes the store depends on, and places a [`Store`] into
/// managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");

        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE_NAME);
        let store = MongoStore::new(client, db);

        if let Err(e) = store.ensure_indexes().await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(Store::new(store)))
    }
}

/// Connect a store to a fresh database at the configured `db_uri`.
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) async fn test_mongo_store() -> MongoStore {
    let config: DbConfig = rocket::Config::figment()
        .extract()
        .expect("`db_uri` not set");
    let client = MongoClient::with_uri_str(&config.db_uri)
        .await
        .unwrap_or_else(|e| panic!("Could not connect to database at {}: {e}", config.db_uri));

    let random: u32 = rand::random();
    let name = format!("test{random}");
    info!("Using database {name}");

    let store = MongoStore::new(client.clone(), client.database(&name));
    store.ensure_indexes().await.unwrap();
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::figment::Figment;

    #[test]
    fn config_from_figment() {
        let config: Config = Figment::new()
            .merge(("auth_ttl", 3600))
            .merge(("jwt_secret", "secret"))
            .extract()
            .unwrap();
        assert_eq!(config.auth_ttl(), Duration::hours(1));
        assert_eq!(config.jwt_secret(), b"secret");
    }

    #[test]
    fn missing_secret_rejected() {
        let result = Figment::new()
            .merge(("auth_ttl", 3600))
            .extract::<Config>();
        assert!(result.is_err());
    }
}
