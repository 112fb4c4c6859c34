//! An in-memory stand-in for the backend, used by tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use chrono::Duration;
use rocket::serde::json::{json, Value};

use crate::config::Config;
use crate::model::{
    token::SessionToken,
    user::{Credentials, LoginResponse, SessionUser},
};

use super::{Backend, BackendError};

/// A request the fake backend received through [`Backend::post`].
#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub path: String,
    pub body: Value,
    pub token: Option<String>,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, (String, SessionUser)>,
    pages: HashMap<String, Value>,
    revoked: HashSet<String>,
    posted: Vec<Posted>,
    logouts: usize,
    failing_logout: bool,
    offline: bool,
}

/// Cloning shares the underlying state, so a test can keep a handle on the
/// same backend its rocket instance talks to.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    /// A backend knowing the example elector and admin, serving a few pages.
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for (credentials, user) in [
                (Credentials::example_elector(), SessionUser::example_elector()),
                (Credentials::example_admin(), SessionUser::example_admin()),
            ] {
                state
                    .accounts
                    .insert(credentials.identifier, (credentials.password, user));
            }
            state.pages.insert(
                "elections".to_string(),
                json!([{ "id": 1, "title": "Presidential 2025", "status": "open" }]),
            );
            state.pages.insert(
                "electors/me".to_string(),
                json!({ "id": 1, "name": "Amina Ngono", "has_voted": false }),
            );
            state.pages.insert(
                "dashboard".to_string(),
                json!({ "open_elections": 1, "votes_cast": 0 }),
            );
            state.pages.insert(
                "admin/dashboard".to_string(),
                json!({ "electors": 2, "turnout": 0.0 }),
            );
            state.pages.insert(
                "public/stats".to_string(),
                json!({ "elections": 1, "electors": 2, "votes": 0 }),
            );
        }
        backend
    }

    /// Serve `value` for GET requests to `path`.
    pub fn serve(&self, path: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(path.to_string(), value);
    }

    /// Make every logout call fail, while everything else keeps working.
    pub fn fail_logouts(&self) {
        self.state.lock().unwrap().failing_logout = true;
    }

    /// Take the whole backend down (or bring it back up).
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// How many logout calls were made, successful or not.
    pub fn logouts(&self) -> usize {
        self.state.lock().unwrap().logouts
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.state.lock().unwrap().posted.clone()
    }

    /// Revoke a token server-side without going through logout.
    pub fn revoke(&self, token: &str) {
        self.state
            .lock()
            .unwrap()
            .revoked
            .insert(token.to_string());
    }

    fn check_online(state: &State) -> Result<(), BackendError> {
        if state.offline {
            Err(BackendError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn unauthorized() -> BackendError {
        BackendError::Http {
            status: 401,
            message: Some("Invalid or expired session".to_string()),
        }
    }
}

#[rocket::async_trait]
impl Backend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        let state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        match state.accounts.get(&credentials.identifier) {
            Some((password, user)) if *password == credentials.password => Ok(LoginResponse {
                token: SessionToken::example_raw(&user.id, user.role, Duration::hours(1)),
                user: user.clone(),
            }),
            _ => Err(BackendError::Http {
                status: 401,
                message: Some("Invalid credentials".to_string()),
            }),
        }
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.logouts += 1;
        if state.failing_logout {
            return Err(BackendError::Unreachable("connection reset".to_string()));
        }
        Self::check_online(&state)?;
        state.revoked.insert(token.to_string());
        Ok(())
    }

    async fn session(&self, token: &str) -> Result<SessionUser, BackendError> {
        let state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        if state.revoked.contains(token) {
            return Err(Self::unauthorized());
        }
        let token =
            SessionToken::verify(token, &Config::example()).map_err(|_| Self::unauthorized())?;
        state
            .accounts
            .values()
            .map(|(_, user)| user)
            .find(|user| user.id == token.user_id())
            .cloned()
            .ok_or_else(Self::unauthorized)
    }

    async fn get(&self, path: &str, _token: Option<&str>) -> Result<Value, BackendError> {
        let state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        state
            .pages
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::Http {
                status: 404,
                message: Some(format!("No resource at {path}")),
            })
    }

    async fn post(
        &self,
        path: &str,
        body: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let mut state = self.state.lock().unwrap();
        Self::check_online(&state)?;
        state.posted.push(Posted {
            path: path.to_string(),
            body,
            token: token.map(str::to_string),
        });
        Ok(json!({ "status": "recorded" }))
    }
}
