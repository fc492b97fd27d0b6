//! Role decisions and the axum middleware built on them.
//!
//! Every gate reduces its outcome to a [`Decision`]. Denials only carry a
//! [`DenialKind`], and the response layer maps that kind to a fixed body, so
//! no decoded claim or internal error ever reaches the caller.
//!
//! The built-in router only mounts `require_token` and
//! `track_authenticated_users`. `require_accounting`, `append_user_id`,
//! `deny_all` and the role predicates are for the shop routes that embed this
//! crate, layered with `axum::middleware::from_fn_with_state`.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::{request, Claims, Identity, Role, Session, SessionRegistry, TokenService};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// Missing, malformed, forged or expired credential.
    InvalidToken,
    /// Valid credential, wrong role or capability.
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Authorized(Identity),
    Denied(DenialKind),
}

impl Decision {
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }
}

/// Generic `{status, message}` envelope.
#[must_use]
pub fn error_envelope(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

impl IntoResponse for DenialKind {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidToken => error_envelope(StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::Unauthorized => error_envelope(StatusCode::FORBIDDEN, "Forbidden"),
        }
    }
}

fn malicious_activity() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Malicious activity detected" })),
    )
        .into_response()
}

/// Shared handles for the gates. One instance is built at startup and cloned into every layer.
#[derive(Clone, Debug)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionRegistry>,
}

impl AuthState {
    #[must_use]
    pub fn new(tokens: Arc<TokenService>, sessions: Arc<SessionRegistry>) -> Self {
        Self { tokens, sessions }
    }

    fn authenticate(&self, token: &str) -> Result<Claims, DenialKind> {
        self.tokens
            .verified_claims(token)
            .ok_or(DenialKind::InvalidToken)
    }

    #[must_use]
    pub fn has_role(&self, token: &str, role: Role) -> Decision {
        match self.authenticate(token) {
            Ok(claims) if claims.data.role == role => Decision::Authorized(claims.data),
            Ok(claims) => {
                debug!(user_id = claims.data.id, "role {} required", role);
                Decision::Denied(DenialKind::Unauthorized)
            }
            Err(kind) => Decision::Denied(kind),
        }
    }

    #[must_use]
    pub fn is_accounting(&self, token: &str) -> Decision {
        self.has_role(token, Role::Accounting)
    }

    #[must_use]
    pub fn is_customer(&self, token: &str) -> Decision {
        self.has_role(token, Role::Customer)
    }

    /// Deluxe role plus a capability value equal to a fresh recomputation for the email.
    pub async fn is_deluxe(&self, token: &str) -> Decision {
        let identity = match self.has_role(token, Role::Deluxe) {
            Decision::Authorized(identity) => identity,
            denied @ Decision::Denied(_) => return denied,
        };
        let Some(claimed) = identity.deluxe_token.as_deref() else {
            return Decision::Denied(DenialKind::Unauthorized);
        };

        let expected = match self.tokens.deluxe_capability(&identity.email).await {
            Ok(expected) => expected,
            Err(e) => {
                warn!("Failed to recompute deluxe capability: {}", e);
                return Decision::Denied(DenialKind::Unauthorized);
            }
        };

        if bool::from(expected.as_bytes().ct_eq(claimed.as_bytes())) {
            Decision::Authorized(identity)
        } else {
            debug!(user_id = identity.id, "deluxe capability mismatch");
            Decision::Denied(DenialKind::Unauthorized)
        }
    }
}

/// Let the request through only for an accounting credential.
pub async fn require_accounting(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let token = request::token_from(req.headers()).unwrap_or_default();
    match state.is_accounting(&token) {
        Decision::Authorized(_) => next.run(req).await,
        Decision::Denied(_) => malicious_activity(),
    }
}

/// Let the request through for any valid credential.
pub async fn require_token(State(state): State<AuthState>, req: Request, next: Next) -> Response {
    let token = request::token_from(req.headers()).unwrap_or_default();
    match state.authenticate(&token) {
        Ok(_) => next.run(req).await,
        Err(kind) => kind.into_response(),
    }
}

pub async fn deny_all() -> Response {
    DenialKind::InvalidToken.into_response()
}

/// Inject the registered user's id as `UserId` into the JSON request body.
pub async fn append_user_id(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(session) = state.sessions.resolve_from_request(req.headers()) else {
        return DenialKind::InvalidToken.into_response();
    };

    let (mut parts, body) = req.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_BYTES).await else {
        return error_envelope(StatusCode::BAD_REQUEST, "Bad Request");
    };

    let mut payload = if bytes.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value @ Value::Object(_)) => value,
            _ => return error_envelope(StatusCode::BAD_REQUEST, "Bad Request"),
        }
    };
    if let Value::Object(map) = &mut payload {
        map.insert("UserId".to_string(), json!(session.identity.id));
    }

    let Ok(bytes) = serde_json::to_vec(&payload) else {
        return error_envelope(StatusCode::BAD_REQUEST, "Bad Request");
    };
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Register credentials seen for the first time and hand them back as a `token` cookie.
///
/// Never blocks the request; unknown or invalid tokens are ignored.
pub async fn track_authenticated_users(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let fresh = request::token_from_cookie_first(req.headers()).filter(|token| {
        state.sessions.lookup(token).is_none() && state.tokens.verify(token)
    });

    let registered = fresh.and_then(|token| {
        let claims = TokenService::decode(&token)?;
        state.sessions.register(&token, Session::from(claims));
        Some(token)
    });

    let mut response = next.run(req).await;

    if let Some(token) = registered {
        match HeaderValue::from_str(&format!("{}={token}; Path=/", request::TOKEN_COOKIE_NAME)) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Err(e) => warn!("Failed to build token cookie: {}", e),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::test_support;
    use anyhow::Result;
    use axum::{
        http::{
            header::{AUTHORIZATION, COOKIE},
            Request as HttpRequest,
        },
        middleware::from_fn_with_state,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn state() -> Result<AuthState> {
        Ok(AuthState::new(
            Arc::new(test_support::token_service()?),
            Arc::new(SessionRegistry::new()),
        ))
    }

    fn app(state: &AuthState) -> Router {
        Router::new()
            .route(
                "/accounting",
                get(|| async { "books" })
                    .layer(from_fn_with_state(state.clone(), require_accounting)),
            )
            .route(
                "/private",
                get(|| async { "private" }).layer(from_fn_with_state(state.clone(), require_token)),
            )
            .route("/closed", get(deny_all))
            .route(
                "/echo",
                post(|body: String| async move { body })
                    .layer(from_fn_with_state(state.clone(), append_user_id)),
            )
            .route(
                "/tracked",
                get(|| async { "tracked" })
                    .layer(from_fn_with_state(state.clone(), track_authenticated_users)),
            )
    }

    fn get_with(uri: &str, token: Option<&str>) -> Result<Request> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(builder.body(Body::empty())?)
    }

    async fn body_json(response: Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn accounting_gate_lets_accountant_through() -> Result<()> {
        let state = state()?;
        let token = state
            .tokens
            .issue(&Identity::new(3, "accountant@juice-sh.op", Role::Accounting))
            .await?;

        let response = app(&state).oneshot(get_with("/accounting", Some(&token))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&bytes[..], b"books");
        Ok(())
    }

    #[tokio::test]
    async fn accounting_gate_rejects_customer_generically() -> Result<()> {
        let state = state()?;
        let token = state
            .tokens
            .issue(&Identity::new(1, "jim@juice-sh.op", Role::Customer))
            .await?;

        let response = app(&state).oneshot(get_with("/accounting", Some(&token))?).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await?;
        assert_eq!(body, json!({ "error": "Malicious activity detected" }));
        assert!(!body.to_string().contains("jim@juice-sh.op"));
        Ok(())
    }

    #[tokio::test]
    async fn accounting_gate_rejects_missing_and_garbage_tokens() -> Result<()> {
        let state = state()?;
        for token in [None, Some("garbage"), Some("a.b.c")] {
            let response = app(&state).oneshot(get_with("/accounting", token)?).await?;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{token:?}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn token_gate_and_deny_all() -> Result<()> {
        let state = state()?;
        let token = state
            .tokens
            .issue(&Identity::new(1, "jim@juice-sh.op", Role::Customer))
            .await?;

        let response = app(&state).oneshot(get_with("/private", Some(&token))?).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&state).oneshot(get_with("/private", None)?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await?,
            json!({ "status": "error", "message": "Unauthorized" })
        );

        let response = app(&state).oneshot(get_with("/closed", Some(&token))?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn append_user_id_injects_registered_user() -> Result<()> {
        let state = state()?;
        let identity = Identity::new(42, "amy@juice-sh.op", Role::Customer);
        state.sessions.register(
            "tok42",
            Session {
                identity,
                issued_at: 0,
                expires_at: 0,
                basket_id: None,
            },
        );

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header(AUTHORIZATION, "Bearer tok42")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"comment":"hi"}"#))?;
        let response = app(&state).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await?,
            json!({ "comment": "hi", "UserId": 42 })
        );
        Ok(())
    }

    #[tokio::test]
    async fn append_user_id_rejects_unknown_token() -> Result<()> {
        let state = state()?;
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header(AUTHORIZATION, "Bearer nobody")
            .body(Body::from("{}"))?;
        let response = app(&state).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await?,
            json!({ "status": "error", "message": "Unauthorized" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn append_user_id_rejects_non_object_body() -> Result<()> {
        let state = state()?;
        state.sessions.register(
            "tok1",
            Session {
                identity: Identity::new(1, "jim@juice-sh.op", Role::Customer),
                issued_at: 0,
                expires_at: 0,
                basket_id: None,
            },
        );
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header(AUTHORIZATION, "Bearer tok1")
            .body(Body::from("[1,2,3]"))?;
        let response = app(&state).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn tracking_registers_new_token_once() -> Result<()> {
        let state = state()?;
        let token = state
            .tokens
            .issue_for_basket(&Identity::new(5, "bjoern@juice-sh.op", Role::Admin), 9)
            .await?;

        let request = HttpRequest::builder()
            .uri("/tracked")
            .header(COOKIE, format!("token={token}"))
            .body(Body::empty())?;
        let response = app(&state).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        assert_eq!(cookie, Some(format!("token={token}; Path=/")));

        let session = state.sessions.lookup(&token);
        assert_eq!(session.as_ref().map(|s| s.identity.id), Some(5));
        assert_eq!(session.and_then(|s| s.basket_id), Some(9));
        assert_eq!(state.sessions.current_token_of(5), Some(token.clone()));

        let response = app(&state).oneshot(get_with("/tracked", Some(&token))?).await?;
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(state.sessions.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn tracking_ignores_invalid_token() -> Result<()> {
        let state = state()?;
        let response = app(&state).oneshot(get_with("/tracked", Some("forged"))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(state.sessions.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn role_predicates() -> Result<()> {
        let state = state()?;
        let customer = state
            .tokens
            .issue(&Identity::new(1, "jim@juice-sh.op", Role::Customer))
            .await?;
        let admin = state
            .tokens
            .issue(&Identity::new(2, "admin@juice-sh.op", Role::Admin))
            .await?;

        assert!(state.is_customer(&customer).is_authorized());
        assert_eq!(
            state.is_customer(&admin),
            Decision::Denied(DenialKind::Unauthorized)
        );
        assert_eq!(
            state.is_customer(""),
            Decision::Denied(DenialKind::InvalidToken)
        );
        assert_eq!(
            state.is_accounting(&customer),
            Decision::Denied(DenialKind::Unauthorized)
        );
        Ok(())
    }

    #[tokio::test]
    async fn deluxe_requires_matching_capability() -> Result<()> {
        let state = state()?;
        let email = "bender@juice-sh.op";
        let capability = state.tokens.deluxe_capability(email).await?;

        let valid = state
            .tokens
            .issue(&Identity::new(3, email, Role::Deluxe).with_deluxe_token(capability.clone()))
            .await?;
        assert!(state.is_deluxe(&valid).await.is_authorized());

        let stale = state
            .tokens
            .issue(&Identity::new(3, email, Role::Deluxe).with_deluxe_token("0".repeat(64)))
            .await?;
        assert_eq!(
            state.is_deluxe(&stale).await,
            Decision::Denied(DenialKind::Unauthorized)
        );

        let missing = state
            .tokens
            .issue(&Identity::new(3, email, Role::Deluxe))
            .await?;
        assert_eq!(
            state.is_deluxe(&missing).await,
            Decision::Denied(DenialKind::Unauthorized)
        );

        let other_email = state
            .tokens
            .issue(
                &Identity::new(4, "mc.safesearch@juice-sh.op", Role::Deluxe)
                    .with_deluxe_token(capability.clone()),
            )
            .await?;
        assert_eq!(
            state.is_deluxe(&other_email).await,
            Decision::Denied(DenialKind::Unauthorized)
        );

        let customer = state
            .tokens
            .issue(&Identity::new(3, email, Role::Customer).with_deluxe_token(capability))
            .await?;
        assert_eq!(
            state.is_deluxe(&customer).await,
            Decision::Denied(DenialKind::Unauthorized)
        );
        Ok(())
    }
}
