use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};

use accountgate_auth::{AssignedUserRoles, Permission};
use accountgate_core::{AccountId, UserId};

use crate::app::errors::ApiError;
use crate::app::routes::common::{json_body, parse_account_id, ACCOUNT_NOT_FOUND};
use crate::app::{dto, services::AppServices};
use crate::authz::require_permission;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/:account_id/users", get(list_users))
        .route("/:account_id/users/:user_id", put(set_user_roles).delete(remove_user))
}

/// Attach identity data to each user; users unknown to the identity
/// provider are returned with their roles only.
pub(crate) async fn users_with_identities(
    services: &AppServices,
    users: Vec<AssignedUserRoles>,
) -> Result<Vec<Value>, ApiError> {
    let ids: Vec<UserId> = users.iter().map(|u| u.user_id.clone()).collect();
    let identities = services.permissions.get_user_data_map(&ids).await?;
    Ok(users
        .into_iter()
        .map(|u| {
            let identity = identities.get(&u.user_id);
            dto::user_to_json(u, identity)
        })
        .collect())
}

fn users_resource(account_id: &AccountId) -> String {
    format!("accounts/{account_id}/users")
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &users_resource(&account_id),
        &Permission::USERS_READ,
        "User does not have access to read the users of this account.",
    )
    .await?;

    let users = services
        .permissions
        .get_users_that_have_access_to_account(&account_id)
        .await?;
    let users = users_with_identities(&services, users).await?;

    Ok((StatusCode::OK, Json(json!({ "users": users }))).into_response())
}

pub async fn set_user_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((account_id, target_user)): Path<(String, String)>,
    body: Result<Json<dto::SetUserRolesRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    let target_user: UserId = target_user
        .parse()
        .map_err(|_| ApiError::BadRequest("userId must not be empty.".to_string()))?;
    require_permission(
        &services,
        &user,
        &users_resource(&account_id),
        &Permission::USERS_UPDATE,
        "User does not have access to update the users of this account.",
    )
    .await?;
    let body = json_body(body)?;

    let account = services
        .accounts
        .get_account(&account_id)
        .ok_or(ApiError::NotFound(ACCOUNT_NOT_FOUND))?;

    services
        .permissions
        .set_role_for_user(&account_id, &target_user, &[account.resource_uri()], &body.roles)
        .await?;

    tracing::info!(
        %account_id,
        user_id = %target_user,
        updated_by = %user.user_id(),
        "user roles updated"
    );
    Ok((
        StatusCode::OK,
        Json(json!({ "userId": target_user, "roles": body.roles })),
    )
        .into_response())
}

pub async fn remove_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path((account_id, target_user)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    let target_user: UserId = target_user
        .parse()
        .map_err(|_| ApiError::BadRequest("userId must not be empty.".to_string()))?;
    require_permission(
        &services,
        &user,
        &users_resource(&account_id),
        &Permission::USERS_DELETE,
        "User does not have access to remove users from this account.",
    )
    .await?;

    services
        .permissions
        .remove_user_from_account(&account_id, &target_user)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
