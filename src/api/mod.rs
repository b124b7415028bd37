use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::model::response::ApiFailure;

mod meta;
mod search;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(search::routes());
    routes.extend(voter::routes());
    routes.extend(meta::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![failure]
}

/// Render failures Rocket produces itself (unmatched routes, malformed bodies)
/// in the same envelope as handler errors.
#[catch(default)]
fn failure(status: Status, _req: &Request<'_>) -> (Status, Json<ApiFailure>) {
    let reason = status.reason().unwrap_or("Request failed");
    (status, Json(ApiFailure::new(reason)))
}
