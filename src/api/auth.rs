use log::{info, warn};
use rocket::{
    get,
    http::{Cookie, CookieJar, Status},
    post, routes,
    serde::json::Json,
    Route, State,
};

use crate::{
    backend::Upstream,
    config::Config,
    error::{Error, Result},
    model::{
        token::{SessionToken, SESSION_COOKIE},
        user::{Credentials, LoginResponse, SessionUser},
    },
};

pub fn routes() -> Vec<Route> {
    routes![login, logout, session]
}

/// Forward credentials to the backend and, if it accepts them, hand its
/// token to the browser in the session cookie.
#[post("/api/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    backend: Upstream,
    config: &State<Config>,
) -> Result<Json<SessionUser>> {
    let LoginResponse { token, user } = backend
        .login(&credentials)
        .await
        .map_err(Error::login_failed)?;

    // Anything we cannot verify now would be bounced by the gate later.
    let token = SessionToken::verify(&token, config).map_err(|e| {
        Error::Status(
            Status::BadGateway,
            format!("Backend issued a session token that does not verify: {e}"),
        )
    })?;
    if token.role() != user.role || token.user_id() != user.id {
        warn!(
            "Token for {} ({}) issued alongside user {} ({})",
            token.user_id(),
            token.role(),
            user.id,
            user.role
        );
    }

    cookies.add(token.into_cookie(config));
    info!("User {} signed in as {}", user.id, user.role);

    Ok(Json(user))
}

/// Invalidate the backend session if we can, then drop the cookie whatever
/// happened.
#[post("/api/auth/logout")]
pub async fn logout(cookies: &CookieJar<'_>, backend: Upstream) -> Status {
    let token = cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());
    if let Some(token) = token {
        if let Err(e) = backend.logout(&token).await {
            warn!("Backend logout failed, clearing cookie anyway: {e}");
        }
    }

    cookies.remove(Cookie::named(SESSION_COOKIE));
    Status::Ok
}

/// The user behind the session cookie, according to the backend. A session
/// the backend no longer recognises is dropped.
#[get("/api/auth/session")]
pub async fn session(cookies: &CookieJar<'_>, backend: Upstream) -> Result<Json<SessionUser>> {
    let token = cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| Error::unauthorized("Not signed in"))?;

    match backend.session(&token).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => {
            info!("Session check failed, clearing cookie: {e}");
            cookies.remove(Cookie::named(SESSION_COOKIE));
            Err(Error::unauthorized("Session expired"))
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{json, Value},
        uri,
    };

    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::model::role::Role;

    #[backend_test]
    async fn login_valid(client: Client) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(Credentials::example_elector()).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let user = response.into_json::<SessionUser>().await.unwrap();
        assert_eq!(user, SessionUser::example_elector());

        let cookies = client.cookies();
        let cookie = cookies.get(SESSION_COOKIE).unwrap();
        let config = client.rocket().state::<Config>().unwrap();
        let token = SessionToken::verify(cookie.value(), config).unwrap();
        assert_eq!(token.role(), Role::Elector);
        assert_eq!(token.user_id(), "1");
    }

    #[backend_test]
    async fn login_invalid(client: Client) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(Credentials::example_wrong_password()).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Unauthorized);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
        let body = response.into_json::<Value>().await.unwrap();
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[backend_test]
    async fn login_backend_down(client: Client, backend: FakeBackend) {
        backend.set_offline(true);
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(Credentials::example_elector()).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::BadGateway);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
        let body = response.into_json::<Value>().await.unwrap();
        assert_eq!(body["message"], "Login failed");
    }

    #[backend_test]
    async fn login_malformed_body(client: Client) {
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(r#"{"identifier": "elector@civix.test"}"#)
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::UnprocessableEntity);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
    }

    #[backend_test(elector)]
    async fn logout_elector(client: Client, backend: FakeBackend) {
        assert!(client.cookies().get(SESSION_COOKIE).is_some());

        let response = client.post(uri!(logout)).dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
        assert_eq!(backend.logouts(), 1);
    }

    #[backend_test(elector)]
    async fn logout_when_backend_fails(client: Client, backend: FakeBackend) {
        backend.set_offline(true);

        let response = client.post(uri!(logout)).dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
    }

    #[backend_test]
    async fn logout_not_logged_in(client: Client, backend: FakeBackend) {
        let response = client.post(uri!(logout)).dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(backend.logouts(), 0);
    }

    #[backend_test(admin)]
    async fn session_of_signed_in_user(client: Client) {
        let response = client.get(uri!(session)).dispatch().await;

        assert_eq!(response.status(), Status::Ok);
        let user = response.into_json::<SessionUser>().await.unwrap();
        assert_eq!(user, SessionUser::example_admin());
    }

    #[backend_test(elector)]
    async fn session_revoked_by_backend(client: Client, backend: FakeBackend) {
        let token = client
            .cookies()
            .get(SESSION_COOKIE)
            .unwrap()
            .value()
            .to_string();
        backend.revoke(&token);

        let response = client.get(uri!(session)).dispatch().await;

        assert_eq!(response.status(), Status::Unauthorized);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
    }

    #[backend_test]
    async fn session_not_logged_in(client: Client) {
        let response = client.get(uri!(session)).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
