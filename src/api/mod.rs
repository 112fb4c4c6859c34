use rocket::Route;

pub mod auth;
pub mod pages;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(pages::routes());
    routes
}
