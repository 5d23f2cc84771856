use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use spendwise_auth::Capability;

use crate::app::errors;
use crate::app::routes::transactions;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:username", get(get_user))
        .route(
            "/:username/transactions",
            get(transactions::list_for_user)
                .post(transactions::create_transaction)
                .delete(transactions::delete_transaction),
        )
        .route(
            "/:username/transactions/category/:category",
            get(transactions::list_for_user_in_category),
        )
}

/// GET /api/users - admin only
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let grant = match authz::require(&session, &Capability::Admin) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.respond(StatusCode::OK, services.users.all())
}

/// GET /api/users/:username - the user themself, or an admin
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(username): Path<String>,
) -> Response {
    let grant = match authz::require_any(
        &session,
        &[Capability::user(username.as_str()), Capability::Admin],
    ) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(
        services
            .users
            .get(&username)
            .ok_or_else(|| errors::bad_request("User not found")),
    )
}
