use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::{
    directory::UserDirectory,
    security::{gates::error_envelope, AuthState, Role, TokenService},
};

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationDetail {
    pub id: u64,
    pub email: String,
    pub role: Role,
    /// Issue time of the user's current credential, in milliseconds.
    pub last_login_time: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthenticationDetails {
    pub status: String,
    pub data: Vec<AuthenticationDetail>,
}

#[utoipa::path(
    get,
    path= "/rest/user/authentication-details",
    responses (
        (status = 200, description = "Users with their last login time", body = AuthenticationDetails),
        (status = 401, description = "Missing or invalid credential"),
    ),
    security(("bearer" = [])),
    tag= "users"
)]
#[instrument(skip_all)]
pub async fn authentication_details(
    Extension(auth): Extension<AuthState>,
    Extension(directory): Extension<Arc<dyn UserDirectory>>,
) -> Response {
    let users = match directory.list_all().await {
        Ok(users) => users,
        Err(e) => {
            error!("Failed to list users: {:#}", e);
            return error_envelope(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        }
    };

    let data = users
        .into_iter()
        .map(|user| {
            let last_login_time = auth
                .sessions
                .current_token_of(user.id)
                .and_then(|token| TokenService::decode(&token))
                .map(|claims| claims.iat.saturating_mul(1000));
            AuthenticationDetail {
                id: user.id,
                email: user.email,
                role: user.role,
                last_login_time,
            }
        })
        .collect();

    Json(AuthenticationDetails {
        status: "success".to_string(),
        data,
    })
    .into_response()
}
