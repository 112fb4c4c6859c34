use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Different privilege levels. The backend has used several spellings over
/// time; they are all folded into this enumeration when parsed.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Elector,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Does this role grant access to the administration pages?
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// Canonical spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elector => "elector",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("Unknown role {0:?}")]
    Unknown(String),
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elector" | "electeur" | "voter" => Ok(Self::Elector),
            "admin" | "administrator" | "administrateur" => Ok(Self::Admin),
            "super_admin" | "superadmin" | "super-admin" => Ok(Self::SuperAdmin),
            _ => Err(RoleError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = RoleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{serde_json, Value};

    use super::*;

    #[test]
    fn spellings_are_normalised() {
        for spelling in ["elector", "ELECTEUR", "Voter", " electeur "] {
            assert_eq!(spelling.parse::<Role>(), Ok(Role::Elector), "{spelling}");
        }
        for spelling in ["admin", "ADMIN", "administrator", "Administrateur"] {
            assert_eq!(spelling.parse::<Role>(), Ok(Role::Admin), "{spelling}");
        }
        for spelling in ["super_admin", "SUPERADMIN", "super-admin"] {
            assert_eq!(spelling.parse::<Role>(), Ok(Role::SuperAdmin), "{spelling}");
        }
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert_eq!(
            "candidate".parse::<Role>(),
            Err(RoleError::Unknown("candidate".to_string()))
        );
        assert!("".parse::<Role>().is_err());
        assert!(serde_json::from_str::<Role>(r#""root""#).is_err());
    }

    #[test]
    fn serialises_canonically() {
        let role: Role = serde_json::from_str(r#""ADMINISTRATEUR""#).unwrap();
        assert_eq!(serde_json::to_value(role).unwrap(), Value::from("admin"));
        assert_eq!(Role::SuperAdmin.to_string(), "super_admin");
    }

    #[test]
    fn admin_rights() {
        assert!(!Role::Elector.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
    }
}
