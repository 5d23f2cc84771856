//! Transaction endpoints.
//!
//! Per-user routes live under `/api/users/:username/transactions` and admit
//! the user themself or an admin; the full listing is admin only.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use spendwise_auth::Capability;

use crate::app::services::{AppServices, Transaction};
use crate::app::{dto, errors};
use crate::authz::{self, Grant};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_all))
}

fn owner_or_admin(session: &SessionContext, username: &str) -> Result<Grant, Response> {
    authz::require_any(session, &[Capability::user(username), Capability::Admin])
}

/// GET /api/transactions - admin only
pub async fn list_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let grant = match authz::require(&session, &Capability::Admin) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.respond(StatusCode::OK, services.all_transactions())
}

/// POST /api/users/:username/transactions
pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(username): Path<String>,
    payload: Result<Json<dto::CreateTransactionRequest>, JsonRejection>,
) -> Response {
    let grant = match owner_or_admin(&session, &username) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(create(&services, &username, payload))
}

fn create(
    services: &AppServices,
    username: &str,
    payload: Result<Json<dto::CreateTransactionRequest>, JsonRejection>,
) -> Result<Transaction, Response> {
    let body = dto::body(payload)?;
    let kind = dto::required(body.kind)?;
    let amount = body
        .amount
        .filter(|a| a.is_finite())
        .ok_or_else(|| errors::bad_request("Missing parameters"))?;

    services
        .record_transaction(username, amount, kind)
        .map_err(errors::store_error_to_response)
}

/// GET /api/users/:username/transactions
pub async fn list_for_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(username): Path<String>,
) -> Response {
    let grant = match owner_or_admin(&session, &username) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(
        services
            .transactions_of(&username, None)
            .map_err(errors::store_error_to_response),
    )
}

/// GET /api/users/:username/transactions/category/:category
pub async fn list_for_user_in_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((username, category)): Path<(String, String)>,
) -> Response {
    let grant = match owner_or_admin(&session, &username) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(
        services
            .transactions_of(&username, Some(&category))
            .map_err(errors::store_error_to_response),
    )
}

/// DELETE /api/users/:username/transactions - body `{"_id": ..}`
pub async fn delete_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(username): Path<String>,
    payload: Result<Json<dto::DeleteTransactionRequest>, JsonRejection>,
) -> Response {
    let grant = match owner_or_admin(&session, &username) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(delete(&services, &username, payload))
}

fn delete(
    services: &AppServices,
    username: &str,
    payload: Result<Json<dto::DeleteTransactionRequest>, JsonRejection>,
) -> Result<serde_json::Value, Response> {
    let id = dto::required(dto::body(payload)?.id)?;

    services
        .delete_transaction(username, &id)
        .map_err(errors::store_error_to_response)?;
    Ok(json!({ "message": "Transaction deleted" }))
}
