use axum::{
    extract::Query,
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;
use utoipa::IntoParams;

use crate::security::{gates::error_envelope, redirect};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RedirectQuery {
    /// Target URL, must be on the allowlist.
    to: Option<String>,
}

#[utoipa::path(
    get,
    path= "/redirect",
    params(RedirectQuery),
    responses (
        (status = 302, description = "Redirect to an allowlisted target"),
        (status = 406, description = "Target is not allowlisted"),
    ),
    tag= "redirect"
)]
pub async fn redirect(Query(query): Query<RedirectQuery>) -> Response {
    match query.to.as_deref() {
        Some(target) if redirect::is_allowed(target) => {
            (StatusCode::FOUND, [(LOCATION, target.to_string())]).into_response()
        }
        _ => {
            warn!("Rejected redirect target");
            error_envelope(StatusCode::NOT_ACCEPTABLE, "Unrecognized target URL for redirect")
        }
    }
}
