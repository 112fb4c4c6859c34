#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod model;
pub mod session;

pub use config::Config;

use config::{BackendFairing, ConfigFairing};
use gate::GateFairing;
use logging::LoggerFairing;

/// Routes and fairings shared by the server and its tests. The gate needs
/// the config to verify cookies, so it is attached after it.
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .mount("/", gate::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(GateFairing)
}

/// The portal, talking to the backend named by `api_base_url`.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build()).attach(BackendFairing)
}

/// The portal in front of the given backend, configured for tests.
#[cfg(test)]
pub(crate) fn rocket_for_backend(backend: backend::Upstream) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", model::token::TEST_JWT_SECRET))
        .merge(("api_base_url", "http://backend.test"))
        .merge(("log_level", "off"));
    assemble(rocket::custom(figment)).manage(backend)
}
