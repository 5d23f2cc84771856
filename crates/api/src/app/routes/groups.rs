//! Group endpoints.
//!
//! Group membership is resolved *before* verification: an unknown group is a
//! 400, never an authorization failure. Request bodies are read only after
//! verification.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use spendwise_auth::Capability;

use crate::app::services::{AppServices, Group, GroupAddition, GroupRemoval};
use crate::app::{dto, errors};
use crate::authz::{self, Grant};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:name", get(get_group))
        .route("/:name/transactions", get(group_transactions))
        .route("/:name/add", patch(add_members))
        .route("/:name/insert", patch(insert_members))
        .route("/:name/remove", patch(remove_members))
        .route("/:name/pull", patch(pull_members))
}

/// POST /api/groups - any authenticated user; the creator is always a member
pub async fn create_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<dto::CreateGroupRequest>, JsonRejection>,
) -> Response {
    let grant = match authz::require(&session, &Capability::Simple) {
        Ok(g) => g,
        Err(res) => return res,
    };

    let creator = grant.identity().email.clone();
    grant.finish(create(&services, creator, payload))
}

fn create(
    services: &AppServices,
    creator: String,
    payload: Result<Json<dto::CreateGroupRequest>, JsonRejection>,
) -> Result<Group, Response> {
    let body = dto::body(payload)?;
    let name = dto::required(body.name)?;
    let mut members = dto::member_emails(body.member_emails)?;
    members.insert(creator);

    services
        .groups
        .create(name, members)
        .map_err(errors::store_error_to_response)
}

/// GET /api/groups - admin only
pub async fn list_groups(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let grant = match authz::require(&session, &Capability::Admin) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.respond(StatusCode::OK, services.groups.all())
}

/// Verify against the members of `name`, optionally admitting admins too.
fn require_group(
    services: &AppServices,
    session: &SessionContext,
    name: &str,
    admins: bool,
) -> Result<Grant, Response> {
    let membership = Capability::for_group(&services.groups, name)
        .map_err(|_| errors::bad_request("Group not found"))?;

    if admins {
        authz::require_any(session, &[membership, Capability::Admin])
    } else {
        authz::require(session, &membership)
    }
}

/// GET /api/groups/:name - group members, or an admin
pub async fn get_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
) -> Response {
    let grant = match require_group(&services, &session, &name, true) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(
        services
            .groups
            .get(&name)
            .ok_or_else(|| errors::bad_request("Group not found")),
    )
}

/// GET /api/groups/:name/transactions - group members, or an admin
pub async fn group_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
) -> Response {
    let grant = match require_group(&services, &session, &name, true) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(
        services
            .groups
            .get(&name)
            .map(|group| services.group_transactions(&group))
            .ok_or_else(|| errors::bad_request("Group not found")),
    )
}

/// PATCH /api/groups/:name/add - group members
pub async fn add_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Response {
    let grant = match require_group(&services, &session, &name, false) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(add(&services, &name, payload))
}

/// PATCH /api/groups/:name/insert - admin only
pub async fn insert_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Response {
    if services.groups.get(&name).is_none() {
        return errors::bad_request("Group not found");
    }
    let grant = match authz::require(&session, &Capability::Admin) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(add(&services, &name, payload))
}

fn add(
    services: &AppServices,
    name: &str,
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Result<GroupAddition, Response> {
    let emails = requested_emails(payload)?;
    services
        .add_to_group(name, emails)
        .map_err(errors::store_error_to_response)
}

/// PATCH /api/groups/:name/remove - group members
pub async fn remove_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Response {
    let grant = match require_group(&services, &session, &name, false) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(remove(&services, &name, payload))
}

/// PATCH /api/groups/:name/pull - admin only
pub async fn pull_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(name): Path<String>,
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Response {
    if services.groups.get(&name).is_none() {
        return errors::bad_request("Group not found");
    }
    let grant = match authz::require(&session, &Capability::Admin) {
        Ok(g) => g,
        Err(res) => return res,
    };

    grant.finish(remove(&services, &name, payload))
}

fn remove(
    services: &AppServices,
    name: &str,
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Result<GroupRemoval, Response> {
    let emails = requested_emails(payload)?;
    services
        .remove_from_group(name, emails)
        .map_err(errors::store_error_to_response)
}

fn requested_emails(
    payload: Result<Json<dto::MemberEmailsRequest>, JsonRejection>,
) -> Result<std::collections::BTreeSet<String>, Response> {
    let emails = dto::body(payload)?
        .member_emails
        .ok_or_else(|| errors::bad_request("Missing parameters"))?;
    dto::member_emails(emails)
}
