use rocket::Route;

pub mod admin;
pub mod auth;
pub mod election;
pub mod results;
pub mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(election::routes());
    routes.extend(results::routes());
    routes.extend(voting::routes());
    routes
}
