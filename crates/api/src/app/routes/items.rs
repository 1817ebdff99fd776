//! Example resources stored inside an account.
//!
//! Callers address an item by its thing id; storage and Authress address it
//! through the owning account (`accounts/{accountId}/resources/{thingId}`).

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use accountgate_auth::{Permission, Role};
use accountgate_core::{Thing, ThingId};

use crate::app::errors::ApiError;
use crate::app::routes::common::{
    json_body, parse_account_id, parse_thing_id, ACCOUNT_NOT_FOUND, RESOURCE_NOT_FOUND,
};
use crate::app::routes::users::users_with_identities;
use crate::app::services::AppServices;
use crate::authz::require_permission;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/:account_id/items", get(list_items).post(create_item))
        .route("/:account_id/items/:item_id", get(get_item))
        .route("/:account_id/items/:item_id/users", get(list_item_users))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &format!("accounts/{account_id}/resources"),
        &Permission::READ,
        "User does not have access to read resources",
    )
    .await?;

    let resources = services.things.get_all_things(&account_id);
    Ok((StatusCode::OK, Json(json!({ "resources": resources }))).into_response())
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &format!("accounts/{account_id}/resources"),
        &Permission::CREATE,
        "User does not have access to create resources",
    )
    .await?;
    let body = json_body(body)?;

    if services.accounts.get_account(&account_id).is_none() {
        return Err(ApiError::NotFound(ACCOUNT_NOT_FOUND));
    }

    let thing_id = ThingId::generate();
    services
        .things
        .create_thing(&account_id, Thing::new(thing_id.clone(), body));

    // The creator owns the new resource, including the right to share it.
    services
        .permissions
        .set_role_for_user(
            &account_id,
            user.user_id(),
            &[Thing::resource_uri(&account_id, &thing_id)],
            &[Role::AUTHRESS_OWNER],
        )
        .await?;

    tracing::info!(%account_id, %thing_id, user_id = %user.user_id(), "resource created");
    Ok((StatusCode::OK, Json(json!({ "resourceId": thing_id }))).into_response())
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((account_id, item_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    let thing_id = parse_thing_id(&item_id)?;
    require_permission(
        &services,
        &user,
        &Thing::resource_uri(&account_id, &thing_id),
        &Permission::READ,
        "User does not have access to read this resource.",
    )
    .await?;

    let thing = services
        .things
        .get_thing(&account_id, &thing_id)
        .ok_or(ApiError::NotFound(RESOURCE_NOT_FOUND))?;

    Ok((StatusCode::OK, Json(thing)).into_response())
}

pub async fn list_item_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((account_id, item_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    let thing_id = parse_thing_id(&item_id)?;
    require_permission(
        &services,
        &user,
        &Thing::resource_uri(&account_id, &thing_id),
        &Permission::USERS_READ,
        "User does not have access to read the users of this resource.",
    )
    .await?;

    let users = services
        .permissions
        .get_users_that_have_access_to_resource(&account_id, &thing_id)
        .await?;
    let users = users_with_identities(&services, users).await?;

    Ok((StatusCode::OK, Json(json!({ "users": users }))).into_response())
}
