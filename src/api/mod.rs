#![allow(clippy::needless_for_each)]

use crate::{
    api::handlers::{
        coupon::{__path_coupon, Discount},
        health::{Health, __path_health},
        redirect::__path_redirect,
        users::{AuthenticationDetail, AuthenticationDetails, __path_authentication_details},
    },
    directory::UserDirectory,
    security::{
        gates::{require_token, track_authenticated_users},
        AuthState, Role,
    },
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, authentication_details, redirect, coupon),
    components(
        schemas(Health, AuthenticationDetail, AuthenticationDetails, Discount, Role)
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "shopguard", description = "Session and access security API"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Application routes, without the request id and tracing layers.
#[must_use]
pub fn router(auth: AuthState, directory: Arc<dyn UserDirectory>) -> Router {
    let protected = Router::new()
        .route(
            "/rest/user/authentication-details",
            get(handlers::authentication_details),
        )
        .route_layer(from_fn_with_state(auth.clone(), require_token));

    Router::new()
        .merge(protected)
        .route("/rest/coupons/:coupon", get(handlers::coupon))
        .route("/redirect", get(handlers::redirect))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(from_fn_with_state(auth.clone(), track_authenticated_users))
        .layer(Extension(auth))
        .layer(Extension(directory))
        .route("/health", get(handlers::health).options(handlers::health))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    auth: AuthState,
    directory: Arc<dyn UserDirectory>,
    mut shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    let app = router(auth, directory).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.recv().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
