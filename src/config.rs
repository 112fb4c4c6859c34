use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    figment::{Error as FigmentError, Figment},
    Build, Rocket,
};
use serde::Deserialize;

use crate::backend::{HttpBackend, Upstream};

/// Cookie lifetime used when `auth_ttl` is not configured: 24 hours.
const DEFAULT_AUTH_TTL: u32 = 24 * 60 * 60;

/// Backend request timeout used when `api_timeout` is not configured.
const DEFAULT_API_TIMEOUT: u32 = 10;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint or fairing.
#[derive(Debug, Deserialize)]
pub struct Config {
    // non-secrets
    api_base_url: String,
    #[serde(default = "default_auth_ttl")]
    auth_ttl: u32,
    #[serde(default = "default_api_timeout")]
    api_timeout: u32,
    #[serde(default)]
    secure_cookie: Option<bool>,
    // secrets
    jwt_secret: String,
}

fn default_auth_ttl() -> u32 {
    DEFAULT_AUTH_TTL
}

fn default_api_timeout() -> u32 {
    DEFAULT_API_TIMEOUT
}

impl Config {
    /// Extract the config from a figment. When `secure_cookie` is not set
    /// explicitly it follows the selected profile: secure in `release` only.
    pub fn from_figment(figment: &Figment) -> Result<Self, FigmentError> {
        let mut config = figment.extract::<Config>()?;
        if config.secure_cookie.is_none() {
            config.secure_cookie = Some(figment.profile() == rocket::Config::RELEASE_PROFILE);
        }
        Ok(config)
    }

    /// Base URL of the backend REST API.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Valid lifetime of the session cookie.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How long to wait for the backend before giving up on a request.
    pub fn api_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.api_timeout.into())
    }

    /// Whether the session cookie is restricted to HTTPS.
    pub fn secure_cookie(&self) -> bool {
        self.secure_cookie.unwrap_or(false)
    }

    /// Secret key shared with the backend, used to verify session JWTs.
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
        let config = match Config::from_figment(rocket.figment()) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!(
            "Loaded application config (backend at {}, secure cookies {})",
            config.api_base_url(),
            if config.secure_cookie() { "on" } else { "off" }
        );

        Ok(rocket.manage(config))
    }
}

/// A fairing that builds the HTTP client for the backend API and places it
/// into managed state as an [`Upstream`]. Must be attached after
/// [`ConfigFairing`].
pub struct BackendFairing;

#[rocket::async_trait]
impl Fairing for BackendFairing {
    fn info(&self) -> Info {
        Info {
            name: "Backend API",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let backend = match rocket.state::<Config>() {
            Some(config) => HttpBackend::new(config.api_base_url(), config.api_timeout()),
            None => {
                error!("Backend API requires the application config to be loaded first");
                return Err(rocket);
            }
        };
        let backend = match backend {
            Ok(backend) => backend,
            Err(e) => {
                error!("Failed to configure backend API client: {e}");
                return Err(rocket);
            }
        };
        info!("Backend API client ready");

        Ok(rocket.manage(Upstream::from(Arc::new(backend))))
    }
}
