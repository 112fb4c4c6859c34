//! The session gate.
//!
//! Every request is classified by path. Public paths and paths on neither
//! list pass untouched; gated paths need a session cookie that verifies, and
//! admin paths additionally need an admin role. A denied request is rerouted
//! to [`denied`], which redirects it (to the login page, or to the home page
//! for a wrong role) and drops a cookie that failed to verify.

use log::debug;
use rocket::{
    fairing::{Fairing, Info, Kind},
    get,
    http::{Cookie, CookieJar, Method},
    request::{FromRequest, Outcome},
    response::Redirect,
    routes, uri, Data, Request, Route,
};

use crate::config::Config;
use crate::model::token::{SessionToken, SESSION_COOKIE};

/// Where unauthenticated requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where authenticated requests lacking the right role are sent.
pub const DEFAULT_PATH: &str = "/";

/// Always reachable, whatever the cookie says. `/` itself is matched exactly.
const PUBLIC_PREFIXES: &[&str] = &[
    "/login",
    "/elections",
    "/candidates",
    "/campaigns",
    "/results",
    "/api/public",
    "/api/auth",
    "/static",
    "/favicon.ico",
];

/// Require a valid session.
const GATED_PREFIXES: &[&str] = &["/vote", "/profil", "/dashboard", "/admin", "/api/private"];

/// Require a valid session with an admin role.
const ADMIN_PREFIXES: &[&str] = &["/admin"];

pub fn routes() -> Vec<Route> {
    routes![denied]
}

/// How a path is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Gated,
    Admin,
    Unlisted,
}

/// The outcome of gating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// Send to the login page, removing the session cookie if asked to.
    Login { clear_cookie: bool },
    /// Signed in, but without the role the path requires.
    Forbidden,
}

/// Does `path` fall under `prefix`? Only whole segments match, so `/vote`
/// covers `/vote` and `/vote/3` but not `/voters`.
fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Classify a path. The allow-list is consulted first.
pub fn classify(path: &str) -> Access {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if path == "/" || PUBLIC_PREFIXES.iter().any(|prefix| under(path, prefix)) {
        Access::Public
    } else if ADMIN_PREFIXES.iter().any(|prefix| under(path, prefix)) {
        Access::Admin
    } else if GATED_PREFIXES.iter().any(|prefix| under(path, prefix)) {
        Access::Gated
    } else {
        Access::Unlisted
    }
}

/// Decide whether a request for `path`, carrying `token` from the session
/// cookie if it had one, may go ahead. Bad signatures and expired tokens are
/// not told apart.
pub fn check(path: &str, token: Option<&str>, config: &Config) -> GateDecision {
    let access = classify(path);
    if matches!(access, Access::Public | Access::Unlisted) {
        return GateDecision::Pass;
    }

    let Some(raw) = token else {
        return GateDecision::Login { clear_cookie: false };
    };
    match SessionToken::verify(raw, config) {
        Err(_) => GateDecision::Login { clear_cookie: true },
        Ok(token) if access == Access::Admin && !token.role().is_admin() => GateDecision::Forbidden,
        Ok(_) => GateDecision::Pass,
    }
}

/// The decoded path of a request, segment by segment, so percent-encoding
/// cannot dodge a prefix.
fn request_path(req: &Request<'_>) -> String {
    let segments = req.uri().path().segments().collect::<Vec<_>>();
    format!("/{}", segments.join("/"))
}

fn evaluate(req: &Request<'_>) -> GateDecision {
    let token = req.cookies().get(SESSION_COOKIE).map(|cookie| cookie.value());
    match req.rocket().state::<Config>() {
        Some(config) => check(&request_path(req), token, config),
        // Without the secret nothing can be verified.
        None => match classify(&request_path(req)) {
            Access::Public | Access::Unlisted => GateDecision::Pass,
            Access::Gated | Access::Admin => GateDecision::Login {
                clear_cookie: token.is_some(),
            },
        },
    }
}

/// The decision made for this request, or [`GateDecision::Pass`] if the gate
/// never saw it.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for GateDecision {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(*req.local_cache(|| GateDecision::Pass))
    }
}

/// A fairing applying [`check`] to every incoming request.
#[derive(Debug, Copy, Clone)]
pub struct GateFairing;

#[rocket::async_trait]
impl Fairing for GateFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session gate",
            kind: Kind::Request,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let decision = evaluate(req);
        req.local_cache(|| decision);
        if decision != GateDecision::Pass {
            debug!("Gate denied {} {}: {decision:?}", req.method(), req.uri());
            req.set_method(Method::Get);
            req.set_uri(uri!(denied));
        }
    }
}

/// Where denied requests end up.
#[get("/gate/denied")]
fn denied(decision: GateDecision, cookies: &CookieJar<'_>) -> Redirect {
    match decision {
        GateDecision::Login { clear_cookie } => {
            if clear_cookie {
                cookies.remove(Cookie::named(SESSION_COOKIE));
            }
            Redirect::to(LOGIN_PATH)
        }
        GateDecision::Forbidden | GateDecision::Pass => Redirect::to(DEFAULT_PATH),
    }
}
