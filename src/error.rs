use jsonwebtoken::errors::Error as JwtError;
use log::{error, warn};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when a login attempt fails without a reason from the backend.
pub const LOGIN_FAILED: &str = "Login failed";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    /// A rejected login: keep the backend's status, and its message if it gave one.
    pub fn login_failed(err: BackendError) -> Self {
        Self::Status(err.status(), err.message_or(LOGIN_FAILED))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Backend(err) => err.status(),
            Self::Jwt(_) => Status::Unauthorized,
            Self::Status(status, _) => *status,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{} {}: {self}", req.method(), req.uri()),
            _ => warn!("{} {}: {self}", req.method(), req.uri()),
        }
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failure_keeps_backend_message() {
        let err = Error::login_failed(BackendError::Http {
            status: 401,
            message: Some("Identifiants invalides".to_string()),
        });
        assert_eq!(err.status(), Status::Unauthorized);
        assert_eq!(err.to_string(), "Identifiants invalides");
    }

    #[test]
    fn login_failure_falls_back_to_generic_message() {
        let err = Error::login_failed(BackendError::Http {
            status: 400,
            message: None,
        });
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.to_string(), LOGIN_FAILED);

        let err = Error::login_failed(BackendError::Unreachable("connection refused".into()));
        assert_eq!(err.status(), Status::BadGateway);
        assert_eq!(err.to_string(), LOGIN_FAILED);
    }
}
