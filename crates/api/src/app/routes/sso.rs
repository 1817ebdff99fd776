use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use accountgate_auth::Permission;

use crate::app::errors::ApiError;
use crate::app::routes::common::{json_body, parse_account_id, ACCOUNT_NOT_FOUND};
use crate::app::{dto, services::AppServices};
use crate::authz::require_permission;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new().route("/:account_id/sso", get(get_sso).put(update_sso))
}

pub async fn get_sso(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &format!("accounts/{account_id}/sso"),
        &Permission::SSO_READ,
        "User does not have access to read the SSO configuration of this account.",
    )
    .await?;

    let sso = services.permissions.get_sso_configuration(&account_id).await;
    Ok((StatusCode::OK, Json(dto::sso_to_json(sso))).into_response())
}

/// A `domain` sets up SSO for the account; no `domain` removes it.
pub async fn update_sso(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
    body: Result<Json<dto::UpdateSsoRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &format!("accounts/{account_id}/sso"),
        &Permission::SSO_UPDATE,
        "User does not have access to update the SSO configuration of this account.",
    )
    .await?;
    let body = json_body(body)?;

    if services.accounts.get_account(&account_id).is_none() {
        return Err(ApiError::NotFound(ACCOUNT_NOT_FOUND));
    }

    match body.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => {
            let connection = body.connection.ok_or_else(|| {
                ApiError::BadRequest("A connection is required when setting an SSO domain.".to_string())
            })?;
            services
                .permissions
                .update_sso_configuration(&account_id, domain, &connection)
                .await?;
            tracing::info!(%account_id, domain, "sso configuration updated");
        }
        None => {
            services
                .permissions
                .delete_sso_configuration(&account_id)
                .await?;
            tracing::info!(%account_id, "sso configuration removed");
        }
    }

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({}))).into_response())
}
