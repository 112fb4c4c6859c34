use std::{fmt::Display, ops::Deref};

use rocket::request::FromParam;
use thiserror::Error;

/// Longest ID we are willing to forward.
const MAX_ID_LENGTH: usize = 64;

/// The ID of a backend resource (election, candidate, campaign), taken from
/// a path segment. Restricted to ASCII alphanumerics, `-` and `_` so it can
/// be spliced into a backend path without escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Empty ID")]
    Empty,
    #[error("ID longer than {} characters", MAX_ID_LENGTH)]
    TooLong,
    #[error("Invalid character {0:?} in ID")]
    InvalidChar(char),
}

impl ResourceId {
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.len() > MAX_ID_LENGTH {
            return Err(IdError::TooLong);
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(IdError::InvalidChar(c));
        }
        Ok(Self(s.to_string()))
    }
}

impl Deref for ResourceId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> FromParam<'a> for ResourceId {
    type Error = IdError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Self::parse(param)
    }
}
