use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use spendwise_auth::Capability;

use crate::authz;
use crate::context::SessionContext;
use crate::cookies;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/whoami - the identity behind the session cookies
pub async fn whoami(Extension(session): Extension<SessionContext>) -> axum::response::Response {
    let grant = match authz::require(&session, &Capability::Simple) {
        Ok(g) => g,
        Err(res) => return res,
    };

    let identity = grant.identity().clone();
    grant.respond(
        StatusCode::OK,
        serde_json::json!({
            "username": identity.username,
            "email": identity.email,
            "role": identity.role,
        }),
    )
}

/// GET /api/logout - clear both session cookies
///
/// A refresh that happens while verifying is discarded: the cookies are
/// being cleared anyway.
pub async fn logout(Extension(session): Extension<SessionContext>) -> axum::response::Response {
    if let Err(res) = authz::require(&session, &Capability::Simple) {
        return res;
    }

    (
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, cookies::cleared(cookies::ACCESS_COOKIE)),
            (header::SET_COOKIE, cookies::cleared(cookies::REFRESH_COOKIE)),
        ]),
        Json(serde_json::json!({ "data": { "message": "User logged out" } })),
    )
        .into_response()
}
