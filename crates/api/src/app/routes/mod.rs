use axum::Router;

pub mod accounts;
pub mod common;
pub mod items;
pub mod sso;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new().nest(
        "/accounts",
        accounts::router()
            .merge(sso::router())
            .merge(users::router())
            .merge(items::router()),
    )
}
