//! Request-side authorization guard.
//!
//! Every protected handler calls [`require`] or [`require_any`] before
//! touching business data. Denials map uniformly to `401 {"error": cause}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use spendwise_auth::{AuthCause, AuthDecision, Capability, Identity, RefreshedToken};

use crate::app::errors;
use crate::context::SessionContext;
use crate::cookies;

/// A granted verification: the verified identity and the refresh effect, if any.
#[derive(Debug, Clone)]
pub struct Grant {
    identity: Identity,
    refreshed: Option<RefreshedToken>,
}

impl Grant {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn refresh_notice(&self) -> Option<&'static str> {
        self.refreshed.as_ref().map(|r| r.notice)
    }

    /// Success envelope `{data, refreshedTokenMessage?}`.
    ///
    /// A refreshed token travels in the response extensions and is turned
    /// into a cookie by the session middleware.
    pub fn respond<T: Serialize>(self, status: StatusCode, data: T) -> Response {
        let mut body = serde_json::json!({ "data": data });
        if let Some(notice) = self.refresh_notice() {
            body["refreshedTokenMessage"] = serde_json::Value::from(notice);
        }

        self.attach((status, Json(body)).into_response())
    }

    /// Error response for a request that passed verification.
    ///
    /// The refreshed token still reaches the client: the error does not undo
    /// the verification that produced it.
    pub fn reject(self, res: Response) -> Response {
        self.attach(res)
    }

    /// `200` envelope on success, [`Grant::reject`] otherwise.
    pub fn finish<T: Serialize>(self, outcome: Result<T, Response>) -> Response {
        match outcome {
            Ok(data) => self.respond(StatusCode::OK, data),
            Err(res) => self.reject(res),
        }
    }

    fn attach(self, mut res: Response) -> Response {
        if let Some(refreshed) = self.refreshed {
            res.extensions_mut().insert(refreshed);
        }
        res
    }
}

pub fn require(session: &SessionContext, capability: &Capability) -> Result<Grant, Response> {
    grant(session.verify(capability))
}

pub fn require_any(session: &SessionContext, capabilities: &[Capability]) -> Result<Grant, Response> {
    grant(session.verify_any(capabilities))
}

fn grant(decision: AuthDecision) -> Result<Grant, Response> {
    if !decision.is_authorized() {
        return Err(denied(decision.cause()));
    }

    let identity = decision.identity().cloned().unwrap_or_default();
    Ok(Grant {
        identity,
        refreshed: decision.into_refreshed(),
    })
}

/// `401` for a denial; a session that can no longer be refreshed also has its
/// cookies cleared.
fn denied(cause: &AuthCause) -> Response {
    let mut res = errors::unauthorized(cause);
    if cause.requires_login() {
        for name in [cookies::ACCESS_COOKIE, cookies::REFRESH_COOKIE] {
            if let Ok(value) = HeaderValue::from_str(&cookies::cleared(name)) {
                res.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }
    res
}
