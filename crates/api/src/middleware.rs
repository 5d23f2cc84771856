use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use spendwise_auth::{RefreshedToken, SessionVerifier};

use crate::context::SessionContext;
use crate::cookies;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<SessionVerifier>,
}

/// Attach the session context and apply any refreshed-token effect.
///
/// Handlers leave a [`RefreshedToken`] in the response extensions; it is
/// turned into a `Set-Cookie` header here.
pub async fn session_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = SessionContext::new(
        state.verifier.clone(),
        cookies::find(req.headers(), cookies::ACCESS_COOKIE),
        cookies::find(req.headers(), cookies::REFRESH_COOKIE),
    );
    req.extensions_mut().insert(session);

    let mut res = next.run(req).await;

    if let Some(refreshed) = res.extensions_mut().remove::<RefreshedToken>() {
        match HeaderValue::from_str(&cookies::refreshed_access(&refreshed)) {
            Ok(value) => {
                res.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("refreshed access token is not a valid header value: {e}"),
        }
    }

    res
}
