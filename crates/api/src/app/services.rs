//! Service wiring shared by every handler.

use std::sync::Arc;

use accountgate_auth::{AuthressApi, PermissionsService};
use accountgate_infra::{
    AccountsRepository, AppConfig, InMemoryAccountsRepository, InMemoryThingsRepository,
    ThingsRepository,
};

pub struct AppServices {
    pub permissions: PermissionsService,
    pub accounts: Arc<dyn AccountsRepository>,
    pub things: Arc<dyn ThingsRepository>,
    pub config: AppConfig,
}

impl AppServices {
    /// Wire the services over `authress` with in-memory repositories.
    pub fn new(config: AppConfig, authress: Arc<dyn AuthressApi>) -> Self {
        Self {
            permissions: PermissionsService::new(authress),
            accounts: Arc::new(InMemoryAccountsRepository::new()),
            things: Arc::new(InMemoryThingsRepository::new()),
            config,
        }
    }
}
