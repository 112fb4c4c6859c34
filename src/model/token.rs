use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{errors::Error as JwtError, DecodingKey, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;

use super::{role::Role, user::string_or_number};

/// The one cookie carrying the session token.
pub const SESSION_COOKIE: &str = "civix-token";

/// A verified session token: a JWT issued by the backend and signed with the
/// secret we share with it.
#[derive(Debug, Clone)]
pub struct SessionToken {
    raw: String,
    claims: Claims,
}

/// Token claims we rely on. Anything else the backend puts in is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    sub: String,
    role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

impl SessionToken {
    /// Verify the signature and expiry of a raw token. A token whose role we
    /// do not recognise fails here too.
    pub fn verify(raw: &str, config: &Config) -> Result<Self, JwtError> {
        let claims = jsonwebtoken::decode(
            raw,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims)?;
        Ok(Self {
            raw: raw.to_string(),
            claims,
        })
    }

    /// The token exactly as issued, for forwarding as a bearer credential.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// ID of the user the token was issued to.
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn expire_at(&self) -> DateTime<Utc> {
        self.claims.expire_at
    }

    /// Wrap this token in the session cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, self.raw)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .secure(config.secure_cookie())
            .same_site(SameSite::Strict)
            .path("/")
            .finish()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionToken {
    type Error = Error;

    /// Get a [`SessionToken`] from the session cookie. Forwards if there is no
    /// cookie at all; fails with `401 Unauthorized` if it does not verify.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = req.rocket().state::<Config>() else {
            let err = Error::Status(Status::InternalServerError, "Config not loaded".into());
            return Outcome::Failure((Status::InternalServerError, err));
        };

        let cookie = try_outcome!(req.cookies().get(SESSION_COOKIE).or_forward(()));

        Self::verify(cookie.value(), config)
            .map_err(Error::from)
            .into_outcome(Status::Unauthorized)
    }
}


#[cfg(test)]
pub use examples::TEST_JWT_SECRET;
