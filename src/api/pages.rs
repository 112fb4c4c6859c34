//! Page routes.
//!
//! Each page is backed by one backend call whose JSON is handed back as-is.
//! Gated pages take a [`SessionToken`] and forward it as the bearer
//! credential; the session gate has already turned away requests without
//! one, so the guard only matters if a route is reached some other way.

use std::path::PathBuf;

use rocket::{
    get,
    http::{uri::Origin, Status},
    post, routes,
    serde::json::{json, Json, Value},
    Route,
};

use crate::{
    backend::{endpoints, Upstream},
    error::{Error, Result},
    gate::DEFAULT_PATH,
    model::{id::ResourceId, token::SessionToken},
};

type Page = Result<Json<Value>>;

pub fn routes() -> Vec<Route> {
    routes![
        home,
        login_page,
        elections,
        election,
        candidates,
        candidate,
        campaigns,
        campaign,
        results,
        public,
        ballot,
        cast_vote,
        profile,
        dashboard,
        admin_dashboard,
        private,
    ]
}

/// Keep the caller's query string (filters, pagination) on a listing.
fn with_query(path: &str, uri: &Origin<'_>) -> String {
    match uri.query() {
        Some(query) => format!("{path}?{}", query.as_str()),
        None => path.to_string(),
    }
}

/// Join the segments of a `<path..>` parameter with `/`.
fn joined(namespace: &str, path: &PathBuf) -> String {
    let segments = path.iter().filter_map(|s| s.to_str());
    std::iter::once(namespace)
        .filter(|namespace| !namespace.is_empty())
        .chain(segments)
        .collect::<Vec<_>>()
        .join("/")
}

#[get("/")]
async fn home(backend: Upstream) -> Page {
    Ok(Json(backend.get(endpoints::PUBLIC_STATS, None).await?))
}

/// The login form itself is rendered client-side; this describes where it posts.
#[get("/login")]
fn login_page() -> Json<Value> {
    Json(json!({
        "action": "/api/auth/login",
        "method": "POST",
        "fields": ["identifier", "password"],
        "redirect": DEFAULT_PATH,
    }))
}

#[get("/elections")]
async fn elections(uri: &Origin<'_>, backend: Upstream) -> Page {
    let path = with_query(endpoints::ELECTIONS, uri);
    Ok(Json(backend.get(&path, None).await?))
}

#[get("/elections/<election_id>")]
async fn election(election_id: ResourceId, backend: Upstream) -> Page {
    let path = format!("{}/{election_id}", endpoints::ELECTIONS);
    Ok(Json(backend.get(&path, None).await?))
}

#[get("/candidates")]
async fn candidates(uri: &Origin<'_>, backend: Upstream) -> Page {
    let path = with_query(endpoints::CANDIDATES, uri);
    Ok(Json(backend.get(&path, None).await?))
}

#[get("/candidates/<candidate_id>")]
async fn candidate(candidate_id: ResourceId, backend: Upstream) -> Page {
    let path = format!("{}/{candidate_id}", endpoints::CANDIDATES);
    Ok(Json(backend.get(&path, None).await?))
}

#[get("/campaigns")]
async fn campaigns(uri: &Origin<'_>, backend: Upstream) -> Page {
    let path = with_query(endpoints::CAMPAIGNS, uri);
    Ok(Json(backend.get(&path, None).await?))
}

#[get("/campaigns/<campaign_id>")]
async fn campaign(campaign_id: ResourceId, backend: Upstream) -> Page {
    let path = format!("{}/{campaign_id}", endpoints::CAMPAIGNS);
    Ok(Json(backend.get(&path, None).await?))
}

#[get("/results/<election_id>")]
async fn results(election_id: ResourceId, backend: Upstream) -> Page {
    let path = format!("{}/{election_id}", endpoints::RESULTS);
    Ok(Json(backend.get(&path, None).await?))
}

/// The backend's public namespace, e.g. turnout statistics.
#[get("/api/public/<path..>")]
async fn public(path: PathBuf, uri: &Origin<'_>, backend: Upstream) -> Page {
    let path = with_query(&joined(endpoints::PUBLIC, &path), uri);
    Ok(Json(backend.get(&path, None).await?))
}

/// The ballot for an election, as presented to the signed-in elector.
#[get("/vote/<election_id>")]
async fn ballot(token: SessionToken, election_id: ResourceId, backend: Upstream) -> Page {
    let path = format!("{}/{election_id}/ballot", endpoints::ELECTIONS);
    Ok(Json(backend.get(&path, Some(token.raw())).await?))
}

/// Cast a vote. Eligibility and double-voting are the backend's business.
#[post("/vote/<election_id>", data = "<vote>", format = "json")]
async fn cast_vote(
    token: SessionToken,
    election_id: ResourceId,
    vote: Json<Value>,
    backend: Upstream,
) -> Page {
    let path = format!("{}/{election_id}/votes", endpoints::ELECTIONS);
    Ok(Json(
        backend
            .post(&path, vote.into_inner(), Some(token.raw()))
            .await?,
    ))
}

#[get("/profil")]
async fn profile(token: SessionToken, backend: Upstream) -> Page {
    Ok(Json(backend.get(endpoints::PROFILE, Some(token.raw())).await?))
}

#[get("/dashboard")]
async fn dashboard(token: SessionToken, backend: Upstream) -> Page {
    Ok(Json(
        backend.get(endpoints::DASHBOARD, Some(token.raw())).await?,
    ))
}

#[get("/admin/dashboard")]
async fn admin_dashboard(token: SessionToken, backend: Upstream) -> Page {
    if !token.role().is_admin() {
        return Err(Error::Status(
            Status::Forbidden,
            format!("The {} role cannot see the admin dashboard", token.role()),
        ));
    }
    Ok(Json(
        backend
            .get(endpoints::ADMIN_DASHBOARD, Some(token.raw()))
            .await?,
    ))
}

/// Anything else the backend serves to signed-in users.
#[get("/api/private/<path..>")]
async fn private(token: SessionToken, path: PathBuf, uri: &Origin<'_>, backend: Upstream) -> Page {
    let path = with_query(&joined("", &path), uri);
    Ok(Json(backend.get(&path, Some(token.raw())).await?))
}
