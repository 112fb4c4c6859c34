use serde::{Deserialize, Deserializer, Serialize};

use super::role::Role;

/// Login credentials, forwarded to the backend untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

/// The display identity of a signed-in user, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

/// Successful login: the bearer token plus the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    pub token: String,
    pub user: SessionUser,
}

/// Backend IDs are numeric in some collections and strings in others.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::String(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "correct horse battery staple";

    impl Credentials {
        pub fn example_elector() -> Self {
            Self::new("elector@civix.test", EXAMPLE_PASSWORD)
        }

        pub fn example_admin() -> Self {
            Self::new("admin@civix.test", EXAMPLE_PASSWORD)
        }

        pub fn example_wrong_password() -> Self {
            Self::new("elector@civix.test", "hunter2")
        }
    }

    impl SessionUser {
        pub fn example_elector() -> Self {
            Self {
                id: "1".to_string(),
                name: "Amina Ngono".to_string(),
                email: Some("elector@civix.test".to_string()),
                role: Role::Elector,
            }
        }

        pub fn example_admin() -> Self {
            Self {
                id: "2".to_string(),
                name: "Paul Biyong".to_string(),
                email: Some("admin@civix.test".to_string()),
                role: Role::Admin,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn user_from_backend_dto() {
        let user: SessionUser = serde_json::from_str(
            r#"{"_id": 42, "name": "Amina", "email": "amina@civix.test", "role": "ELECTEUR", "extra": true}"#,
        )
        .unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.role, Role::Elector);
        assert_eq!(user.email.as_deref(), Some("amina@civix.test"));

        let user: SessionUser =
            serde_json::from_str(r#"{"id": "abc", "role": "administrator"}"#).unwrap();
        assert_eq!(user.id, "abc");
        assert_eq!(user.name, "");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn user_with_unknown_role_is_rejected() {
        let result =
            serde_json::from_str::<SessionUser>(r#"{"id": 1, "name": "Eve", "role": "hacker"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn login_response_aliases() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"accessToken": "x.y.z", "user": {"id": 1, "role": "admin"}}"#,
        )
        .unwrap();
        assert_eq!(response.token, "x.y.z");
        assert_eq!(response.user.role, Role::Admin);
    }
}
