use axum::extract::rejection::JsonRejection;
use axum::Json;

use accountgate_core::{AccountId, ThingId};

use crate::app::errors::ApiError;

pub const ACCOUNT_NOT_FOUND: &str = "Account not found.";
pub const RESOURCE_NOT_FOUND: &str = "Resource not found.";

/// Path segments that cannot be valid ids name nothing that exists.
pub fn parse_account_id(raw: &str) -> Result<AccountId, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(ACCOUNT_NOT_FOUND))
}

pub fn parse_thing_id(raw: &str) -> Result<ThingId, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(RESOURCE_NOT_FOUND))
}

/// Unwrap a JSON body extracted as `Result`. Call only after the caller's
/// permission has been checked.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_ids_are_not_found() {
        assert!(matches!(parse_account_id("thg_1"), Err(ApiError::NotFound(ACCOUNT_NOT_FOUND))));
        assert!(matches!(parse_thing_id("acc_1"), Err(ApiError::NotFound(RESOURCE_NOT_FOUND))));
    }
}
