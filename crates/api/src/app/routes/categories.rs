use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use spendwise_auth::Capability;

use crate::app::services::{AppServices, Category};
use crate::app::{dto, errors};
use crate::authz;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_categories).post(create_category))
}

/// GET /api/categories - any authenticated user
pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let grant = match authz::require(&session, &Capability::Simple) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.respond(StatusCode::OK, services.categories.all())
}

/// POST /api/categories - admin only
pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<dto::CreateCategoryRequest>, JsonRejection>,
) -> Response {
    let grant = match authz::require(&session, &Capability::Admin) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(create(&services, payload))
}

fn create(
    services: &AppServices,
    payload: Result<Json<dto::CreateCategoryRequest>, JsonRejection>,
) -> Result<Category, Response> {
    let body = dto::body(payload)?;
    let kind = dto::required(body.kind)?;
    let color = dto::required(body.color)?;

    services
        .categories
        .create(kind, color)
        .map_err(errors::store_error_to_response)
}
