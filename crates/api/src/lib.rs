//! HTTP API: router, token middleware, and request handlers.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
