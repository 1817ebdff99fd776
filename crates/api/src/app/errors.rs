use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use accountgate_auth::AuthressError;

pub const TOO_MANY_ACCOUNTS_TITLE: &str =
    "Accounts per user is limited, for more information, please contact support.";

/// Failure of a request handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("too many accounts for one user")]
    TooManyAccounts,

    #[error(transparent)]
    Authress(#[from] AuthressError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Forbidden(title) => json_error(StatusCode::FORBIDDEN, "Forbidden", title),
            ApiError::NotFound(title) => json_error(StatusCode::NOT_FOUND, "NotFound", title),
            ApiError::BadRequest(title) => json_error(StatusCode::BAD_REQUEST, "BadRequest", title),
            ApiError::TooManyAccounts => json_error(
                StatusCode::TOO_MANY_REQUESTS,
                "TooManyAccounts",
                TOO_MANY_ACCOUNTS_TITLE,
            ),
            ApiError::Authress(e) => authress_error_to_response(e),
        }
    }
}

/// Surface client-facing Authress statuses with a fixed title; everything
/// else is a 500. Authress response bodies never reach the caller.
pub fn authress_error_to_response(err: AuthressError) -> axum::response::Response {
    let status = match &err {
        AuthressError::InvalidAccessKey(_) => Some(StatusCode::UNAUTHORIZED),
        AuthressError::Unauthorized { .. } => Some(StatusCode::FORBIDDEN),
        _ => err
            .status()
            .filter(|s| matches!(*s, 401 | 403 | 404 | 429))
            .and_then(|s| StatusCode::from_u16(s).ok()),
    };

    match status {
        Some(status) => {
            tracing::debug!(error = %err, %status, "authress call rejected");
            let title = status.canonical_reason().unwrap_or("Authorization service error");
            json_error(status, err.code(), title)
        }
        None => {
            tracing::error!(error = %err, code = err.code(), "authress call failed");
            internal_error()
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    title: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "errorCode": code,
            "title": title.into(),
        })),
    )
        .into_response()
}

pub fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "title": "Internal Server Error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authress_statuses_pass_through_or_become_500() {
        let not_found = ApiError::from(AuthressError::not_found("record")).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let throttled = ApiError::from(AuthressError::Api {
            status: 429,
            message: "slow down".to_string(),
        })
        .into_response();
        assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);

        let conflict = ApiError::from(AuthressError::Api {
            status: 409,
            message: "exists".to_string(),
        })
        .into_response();
        assert_eq!(conflict.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad_key = ApiError::from(AuthressError::InvalidAccessKey("x".to_string())).into_response();
        assert_eq!(bad_key.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authress_response_bodies_are_not_echoed() {
        let res = ApiError::from(AuthressError::Api {
            status: 404,
            message: "{\"internal\":\"tenant table t_17 missing\"}".to_string(),
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["title"], "Not Found");
        assert!(!bytes.windows(4).any(|w| w == b"t_17"));
    }
}
