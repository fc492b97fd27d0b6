use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::security::{coupon, gates::error_envelope};

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Discount {
    discount: u32,
}

#[utoipa::path(
    get,
    path= "/rest/coupons/{coupon}",
    params(("coupon" = String, Path, description = "Opaque coupon code")),
    responses (
        (status = 200, description = "Coupon is valid this month", body = Discount),
        (status = 404, description = "Unknown, malformed or expired coupon"),
    ),
    tag= "coupons"
)]
pub async fn coupon(Path(code): Path<String>) -> Response {
    match coupon::decode(&code) {
        Some(discount) => Json(Discount { discount }).into_response(),
        None => {
            debug!("coupon rejected");
            error_envelope(StatusCode::NOT_FOUND, "Invalid coupon")
        }
    }
}
