//! The upstream REST backend.
//!
//! Everything authoritative (electors, elections, votes, results) lives in
//! the backend; the portal only forwards requests to it. [`Backend`] is the
//! single seam through which that happens, so handlers and the session store
//! can be exercised against [`fake::FakeBackend`] in tests.

use std::{ops::Deref, sync::Arc};

use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    serde::json::Value,
};
use thiserror::Error;

use crate::model::user::{Credentials, LoginResponse, SessionUser};

mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpBackend;

/// Backend API paths, relative to the configured base URL.
pub mod endpoints {
    pub const LOGIN: &str = "auth/login";
    pub const LOGOUT: &str = "auth/logout";
    pub const SESSION: &str = "auth/me";
    pub const PUBLIC: &str = "public";
    pub const PUBLIC_STATS: &str = "public/stats";
    pub const ELECTIONS: &str = "elections";
    pub const CANDIDATES: &str = "candidates";
    pub const CAMPAIGNS: &str = "campaigns";
    pub const RESULTS: &str = "results";
    pub const PROFILE: &str = "electors/me";
    pub const DASHBOARD: &str = "dashboard";
    pub const ADMIN_DASHBOARD: &str = "admin/dashboard";
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached, or did not answer in time.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    /// The backend answered with a non-success status.
    #[error("{}", .message.as_deref().unwrap_or("Backend request failed"))]
    Http { status: u16, message: Option<String> },
    /// The backend answered with something we could not make sense of.
    #[error("Unexpected backend response: {0}")]
    Decode(String),
    /// The client could not be constructed from the configuration.
    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Status to report to our own client. Client errors are passed through;
    /// anything that went wrong on the far side is a bad gateway.
    pub fn status(&self) -> Status {
        match self {
            Self::Http { status, .. } if (400..500).contains(status) => {
                Status::from_code(*status).unwrap_or(Status::BadGateway)
            }
            Self::Config(_) => Status::InternalServerError,
            _ => Status::BadGateway,
        }
    }

    /// The backend's own explanation if it sent one, otherwise `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            Self::Http {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Operations the portal needs from the backend.
#[rocket::async_trait]
pub trait Backend: Send + Sync {
    /// Exchange credentials for a session token and the user's display fields.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError>;

    /// Invalidate the server-side session behind `token`.
    async fn logout(&self, token: &str) -> Result<(), BackendError>;

    /// Look up the user behind `token`.
    async fn session(&self, token: &str) -> Result<SessionUser, BackendError>;

    /// Fetch a resource, optionally on behalf of an authenticated user.
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, BackendError>;

    /// Submit a JSON document, optionally on behalf of an authenticated user.
    async fn post(&self, path: &str, body: Value, token: Option<&str>)
        -> Result<Value, BackendError>;
}

/// A shared handle on the backend, kept in managed state and available to
/// handlers as a request guard.
#[derive(Clone)]
pub struct Upstream(Arc<dyn Backend>);

impl<B> From<Arc<B>> for Upstream
where
    B: Backend + 'static,
{
    fn from(backend: Arc<B>) -> Self {
        Self(backend)
    }
}

impl Deref for Upstream {
    type Target = dyn Backend;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Upstream {
    type Error = ();

    /// Fails with a server error iff no [`Upstream`] is managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.rocket().state::<Upstream>() {
            Some(upstream) => request::Outcome::Success(upstream.clone()),
            None => request::Outcome::Failure((Status::InternalServerError, ())),
        }
    }
}
