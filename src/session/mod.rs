//! The client-side session cache.
//!
//! A [`SessionStore`] remembers who is signed in and the bearer token to
//! present on their behalf, persisting both through a [`SessionStorage`] so
//! the session survives restarts. It owns no network code of its own: every
//! operation that talks to the backend borrows a [`Backend`].

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    backend::Backend,
    error::{Error, Result},
    model::{
        role::Role,
        user::{Credentials, LoginResponse, SessionUser},
    },
};

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

/// A signed-in user and the token the backend issued them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// A login call is in flight.
    Authenticating,
    Authenticated(Session),
}

pub struct SessionStore<S: SessionStorage> {
    storage: S,
    state: SessionState,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Restore whatever session `storage` holds. Unreadable storage counts as
    /// empty.
    pub fn init(storage: S) -> Self {
        let state = match storage.load() {
            Ok(Some(session)) => {
                debug!("Restored session of user {}", session.user.id);
                SessionState::Authenticated(session)
            }
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                warn!("Ignoring stored session: {e}");
                SessionState::Anonymous
            }
        };
        Self { storage, state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.session().map(|session| &session.user)
    }

    /// The bearer token to present to the backend.
    pub fn token(&self) -> Option<&str> {
        self.session().map(|session| session.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.user().map_or(false, |user| user.role == role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.user().map_or(false, |user| roles.contains(&user.role))
    }

    pub fn is_admin(&self) -> bool {
        self.user().map_or(false, |user| user.role.is_admin())
    }

    /// Ask the backend whether the cached token is still good. If it is, the
    /// cached user is refreshed from the answer; if not, for whatever reason,
    /// the session is dropped.
    pub async fn verify(&mut self, backend: &dyn Backend) -> bool {
        let Some(token) = self.token().map(str::to_string) else {
            return false;
        };

        match backend.session(&token).await {
            Ok(user) => {
                let session = Session { token, user };
                self.persist(&session);
                self.state = SessionState::Authenticated(session);
                true
            }
            Err(e) => {
                info!("Dropping session that failed verification: {e}");
                self.clear();
                false
            }
        }
    }

    /// Sign in. A failed attempt leaves the store exactly as it was, and the
    /// error carries the backend's message if it gave one.
    pub async fn login(
        &mut self,
        backend: &dyn Backend,
        credentials: &Credentials,
    ) -> Result<SessionUser> {
        let previous = std::mem::replace(&mut self.state, SessionState::Authenticating);

        match backend.login(credentials).await {
            Ok(LoginResponse { token, user }) => {
                info!("User {} signed in as {}", user.id, user.role);
                let session = Session {
                    token,
                    user: user.clone(),
                };
                self.persist(&session);
                self.state = SessionState::Authenticated(session);
                Ok(user)
            }
            Err(e) => {
                self.state = previous;
                Err(Error::login_failed(e))
            }
        }
    }

    /// Sign out. The backend is told if possible, but the local session is
    /// gone either way.
    pub async fn logout(&mut self, backend: &dyn Backend) {
        if let Some(token) = self.token() {
            if let Err(e) = backend.logout(token).await {
                warn!("Backend logout failed, clearing session anyway: {e}");
            }
        }
        self.clear();
    }

    /// Give up the store, handing back its storage.
    pub fn dispose(self) -> S {
        self.storage
    }

    fn persist(&mut self, session: &Session) {
        if let Err(e) = self.storage.save(session) {
            warn!("Failed to save session: {e}");
        }
    }

    fn clear(&mut self) {
        self.state = SessionState::Anonymous;
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear stored session: {e}");
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;
    use crate::model::token::SessionToken;

    impl Session {
        pub fn example_elector() -> Self {
            let user = SessionUser::example_elector();
            Self {
                token: SessionToken::example_raw(&user.id, user.role, Duration::hours(1)),
                user,
            }
        }

        pub fn example_admin() -> Self {
            let user = SessionUser::example_admin();
            Self {
                token: SessionToken::example_raw(&user.id, user.role, Duration::hours(1)),
                user,
            }
        }
    }
}
