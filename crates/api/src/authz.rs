//! Permission guard used at the top of every handler.

use accountgate_auth::Permission;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::UserContext;

/// Fail with 403 `title` unless the caller holds `permission` on `resource_uri`.
pub async fn require_permission(
    services: &AppServices,
    user: &UserContext,
    resource_uri: &str,
    permission: &Permission,
    title: &'static str,
) -> Result<(), ApiError> {
    let allowed = services
        .permissions
        .has_access_to_resource(user.user_id(), resource_uri, permission)
        .await?;
    if !allowed {
        tracing::debug!(
            user_id = %user.user_id(),
            resource_uri,
            %permission,
            "permission denied"
        );
        return Err(ApiError::Forbidden(title));
    }
    Ok(())
}
