//! Election administration backend: positions and candidates, a scheduled or
//! manually overridden voting window, one vote per voter per position, and
//! tallies for display and export.

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(all(test, feature = "db-tests"))]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

/// Build the server, ready to ignite.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
}

/// Connect to the database named in the Rocket config.
#[cfg(all(test, feature = "db-tests"))]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// A fresh database name for one test.
#[cfg(all(test, feature = "db-tests"))]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Build a server that uses an existing client and the given database,
/// prepared the same way as in production.
#[cfg(all(test, feature = "db-tests"))]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    let rocket = rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing);
    let config: Config = rocket.figment().extract().unwrap();
    config::prepare_database(&db, &config).await.unwrap();
    rocket.manage(client).manage(db)
}
