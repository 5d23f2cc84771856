use axum::{routing::get, Router};

pub mod categories;
pub mod groups;
pub mod system;
pub mod transactions;
pub mod users;

/// Router for all session-protected endpoints (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/logout", get(system::logout))
        .nest("/users", users::router())
        .nest("/categories", categories::router())
        .nest("/groups", groups::router())
        .nest("/transactions", transactions::router())
}
