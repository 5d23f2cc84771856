//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: in-memory stores for users, categories and groups
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and validation helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use spendwise_auth::{AuthConfig, SessionVerifier};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router with empty stores (public entrypoint used by `main.rs`).
pub fn build_app(auth: &AuthConfig) -> Router {
    build_app_with_services(auth, Arc::new(services::AppServices::default()))
}

/// Build the router around caller-provided stores.
pub fn build_app_with_services(auth: &AuthConfig, services: Arc<services::AppServices>) -> Router {
    let verifier = Arc::new(SessionVerifier::new(auth));
    let auth_state = middleware::AuthState { verifier };

    // Protected routes: every handler verifies the session cookies itself.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::session_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
