//! Storage for the entities owned by this service.
//!
//! Permissions never live here; only the account and thing payloads do.

pub mod accounts;
pub mod things;

pub use accounts::{AccountsRepository, InMemoryAccountsRepository};
pub use things::{InMemoryThingsRepository, ThingsRepository};
