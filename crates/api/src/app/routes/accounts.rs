use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use accountgate_auth::{Permission, Role};
use accountgate_core::{Account, AccountData, AccountId};

use crate::app::errors::ApiError;
use crate::app::routes::common::{json_body, parse_account_id, ACCOUNT_NOT_FOUND};
use crate::app::{dto, services::AppServices};
use crate::authz::require_permission;
use crate::context::UserContext;

const ACCOUNTS_ROOT: &str = "accounts";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/:account_id", get(get_account).put(update_account))
}

/// Account ids among `uris` that are accounts themselves (`accounts/{id}`).
fn account_ids<'a>(uris: impl IntoIterator<Item = &'a str>) -> Vec<AccountId> {
    uris.into_iter()
        .filter_map(|uri| uri.trim_start_matches('/').strip_prefix("accounts/"))
        .filter_map(|id| id.parse().ok())
        .collect()
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> Result<Response, ApiError> {
    let user_id = user.user_id();
    let existing = services
        .permissions
        .get_explicit_user_resources(user_id, ACCOUNTS_ROOT, &Permission::ACCOUNTS_READ)
        .await?;
    let existing = account_ids(existing.iter().map(String::as_str));

    if !existing.is_empty() {
        tracing::info!(
            %user_id,
            count = existing.len(),
            "User creating a second account with the same identity."
        );
        if existing.len() >= services.config.max_accounts_per_user {
            return Err(ApiError::TooManyAccounts);
        }
    }

    let account = Account::new(
        AccountId::generate(),
        AccountData {
            account_creator_id: Some(user_id.clone()),
            company: None,
        },
    );
    services.accounts.create_account(account.clone());

    // An account nobody owns is unreachable; drop it if the grant fails.
    if let Err(e) = services
        .permissions
        .set_role_for_user(
            &account.account_id,
            user_id,
            &[account.resource_uri()],
            &[Role::ACCOUNT_OWNER],
        )
        .await
    {
        services.accounts.delete_account(&account.account_id);
        return Err(e.into());
    }

    tracing::info!(account_id = %account.account_id, %user_id, "account created");
    Ok((
        StatusCode::OK,
        Json(dto::account_to_json(&account, &services.config.public_base_url)),
    )
        .into_response())
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> Result<Response, ApiError> {
    let base_url = services.config.public_base_url.as_str();
    let respond = |accounts: &[Account]| {
        let accounts: Vec<_> = accounts
            .iter()
            .map(|a| dto::account_to_json(a, base_url))
            .collect();
        (StatusCode::OK, Json(serde_json::json!({ "accounts": accounts }))).into_response()
    };

    let permitted = services
        .permissions
        .get_user_resources(user.user_id(), ACCOUNTS_ROOT, &Permission::ACCOUNTS_READ)
        .await?;
    if permitted.access_to_all_sub_resources {
        return Ok(respond(&services.accounts.get_all_accounts()));
    }

    let ids = account_ids(permitted.resources.iter().map(|r| r.resource_uri.as_str()));
    if !ids.is_empty() {
        let accounts: Vec<Account> = ids
            .iter()
            .filter_map(|id| services.accounts.get_account(id))
            .collect();
        return Ok(respond(&accounts));
    }

    // Users federated through an account's SSO tenant can read that account
    // even without an explicit invite.
    let Some(tenant_id) = user.tenant_id() else {
        return Ok(respond(&[]));
    };
    let Some(account) = services.accounts.get_account(tenant_id) else {
        return Ok(respond(&[]));
    };

    services
        .permissions
        .set_role_for_user(
            tenant_id,
            user.user_id(),
            &[account.resource_uri()],
            &[Role::AUTHRESS_READ_RESOURCE],
        )
        .await?;

    Ok(respond(&[account]))
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &format!("accounts/{account_id}"),
        &Permission::ACCOUNTS_READ,
        "User does not have access to read this account.",
    )
    .await?;

    let account = services
        .accounts
        .get_account(&account_id)
        .ok_or(ApiError::NotFound(ACCOUNT_NOT_FOUND))?;

    Ok((
        StatusCode::OK,
        Json(dto::account_to_json(&account, &services.config.public_base_url)),
    )
        .into_response())
}

pub async fn update_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(account_id): Path<String>,
    body: Result<Json<dto::UpdateAccountRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    require_permission(
        &services,
        &user,
        &format!("accounts/{account_id}"),
        &Permission::ACCOUNTS_UPDATE,
        "User does not have access to update this account.",
    )
    .await?;
    let body = json_body(body)?;

    let account = services
        .accounts
        .get_account(&account_id)
        .ok_or(ApiError::NotFound(ACCOUNT_NOT_FOUND))?;

    let data = AccountData {
        company: body.company,
        ..account.data
    };
    let updated = services
        .accounts
        .update_account(&account_id, data)
        .ok_or(ApiError::NotFound(ACCOUNT_NOT_FOUND))?;

    Ok((
        StatusCode::OK,
        Json(dto::account_to_json(&updated, &services.config.public_base_url)),
    )
        .into_response())
}
