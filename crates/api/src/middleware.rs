use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use accountgate_auth::{AuthressError, DEFAULT_AUTHRESS_API_URL};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub const INVALID_ACCESS_KEY_TITLE: &str = "Your Authress service client access key is invalid. \
     Set AUTHRESS_SERVICE_CLIENT_ACCESS_KEY to a service client access key from the Authress management portal.";

pub const MISSING_HEADER_TITLE: &str = "The response is a 401 to your request. \
     Your request failed the Authress token validation check.";

pub const CUSTOM_DOMAIN_TITLE: &str = "Your Authress custom domain is not set. \
     Set AUTHRESS_API_URL to your Authress custom domain.";

pub const INVALID_TOKEN_TITLE: &str = "The response is a 401 to your request. \
     The token in the Authorization header is invalid. Verify that the token used in the request is valid.";

/// Validates the caller's bearer token and stores a [`UserContext`].
pub async fn token_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Err(e) = services.permissions.get_authress_properties() {
        return match e {
            AuthressError::InvalidAccessKey(_) => unauthorized(json!({
                "title": INVALID_ACCESS_KEY_TITLE,
            })),
            other => errors::authress_error_to_response(other),
        };
    }

    let Some(token) = extract_token(req.headers()) else {
        return unauthorized(json!({
            "title": MISSING_HEADER_TITLE,
            "error": "No authorization header was specified",
        }));
    };

    let identity = match services.permissions.verify_user_token(&token).await {
        Ok(identity) => identity,
        Err(e) => return verification_failure(&services, &token, e),
    };

    req.extensions_mut()
        .insert(UserContext::new(identity.user_id, identity.tenant_id));

    next.run(req).await
}

fn verification_failure(services: &AppServices, token: &str, err: AuthressError) -> Response {
    if services.permissions.api_url() == DEFAULT_AUTHRESS_API_URL {
        return unauthorized(json!({
            "title": CUSTOM_DOMAIN_TITLE,
            "error": err.to_string(),
        }));
    }

    match err {
        AuthressError::TokenVerification { .. } | AuthressError::Unauthorized { .. } => {
            tracing::debug!(error = %err, "rejected access token");
            unauthorized(json!({
                "title": INVALID_TOKEN_TITLE,
                "token": token,
                "error": {
                    "code": err.code(),
                    "name": "AuthressError",
                    "reason": err.reason(),
                    "message": err.to_string(),
                },
            }))
        }
        other => errors::authress_error_to_response(other),
    }
}

fn unauthorized(body: serde_json::Value) -> Response {
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Authorization header value without a leading `Bearer` scheme.
///
/// `None` only when the header is absent; an unreadable value yields an
/// empty token, which then fails verification.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().unwrap_or_default().trim_start();
    Some(strip_bearer(value).trim().to_string())
}

fn strip_bearer(value: &str) -> &str {
    match value.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &value[6..];
            let trimmed = rest.trim_start();
            if trimmed.len() < rest.len() { trimmed } else { value }
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive_and_whitespace_tolerant() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("bearer\t  abc"), "abc");
        assert_eq!(strip_bearer("BEARER abc"), "abc");
        assert_eq!(strip_bearer("Bearerabc"), "Bearerabc");
        assert_eq!(strip_bearer("abc"), "abc");
    }

    #[test]
    fn missing_header_is_distinguished_from_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(axum::http::header::AUTHORIZATION, "Bearer  tok ".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("tok"));
    }
}
