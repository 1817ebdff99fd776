//! Infrastructure layer: repositories and configuration.

pub mod config;
pub mod repositories;

pub use config::{AppConfig, ConfigError};
pub use repositories::{
    AccountsRepository, InMemoryAccountsRepository, InMemoryThingsRepository, ThingsRepository,
};
