//! Authress REST client.
//!
//! [`AuthressApi`] is the seam the rest of the service depends on;
//! [`AuthressClient`] implements it over HTTPS using the service client's
//! credentials.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use accountgate_core::UserId;

use crate::model::{AccessRecord, Connection, ResourceUsers, Tenant, UserIdentity, UserResources};
use crate::{AuthressError, Permission, ServiceClientTokenProvider, TokenVerifier, VerifiedIdentity};

/// Placeholder domain shipped in the default configuration.
pub const DEFAULT_AUTHRESS_API_URL: &str = "https://authress.company.com";

/// Placeholder access key shipped in the default configuration.
pub const DEFAULT_SERVICE_CLIENT_ACCESS_KEY: &str = "sc_001.access_key";

#[derive(Clone, PartialEq, Eq)]
pub struct AuthressConfig {
    /// Custom Authress domain, e.g. `https://auth.example.com`.
    pub api_url: String,
    pub service_client_access_key: String,
    pub request_timeout: Duration,
}

impl core::fmt::Debug for AuthressConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthressConfig")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for AuthressConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_AUTHRESS_API_URL.to_string(),
            service_client_access_key: DEFAULT_SERVICE_CLIENT_ACCESS_KEY.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Calls this service makes against Authress.
#[async_trait]
pub trait AuthressApi: Send + Sync {
    /// Configured Authress domain.
    fn api_url(&self) -> &str;

    /// Fails with [`AuthressError::InvalidAccessKey`] when the service
    /// client credentials cannot be used.
    fn check_service_client(&self) -> Result<(), AuthressError>;

    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, AuthressError>;

    /// `Ok(())` when allowed, [`AuthressError::Unauthorized`] when not.
    async fn authorize_user(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
    ) -> Result<(), AuthressError>;

    async fn get_user_resources(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
        limit: u32,
    ) -> Result<UserResources, AuthressError>;

    async fn get_user(&self, user_id: &UserId) -> Result<UserIdentity, AuthressError>;

    async fn get_resource_users(&self, resource_uri: &str) -> Result<ResourceUsers, AuthressError>;

    async fn get_record(&self, record_id: &str) -> Result<AccessRecord, AuthressError>;
    async fn create_record(&self, record: &AccessRecord) -> Result<AccessRecord, AuthressError>;
    async fn update_record(
        &self,
        record_id: &str,
        record: &AccessRecord,
    ) -> Result<AccessRecord, AuthressError>;
    async fn delete_record(&self, record_id: &str) -> Result<(), AuthressError>;

    async fn get_connection(&self, connection_id: &str) -> Result<Connection, AuthressError>;
    async fn update_connection(
        &self,
        connection_id: &str,
        connection: &Connection,
    ) -> Result<Connection, AuthressError>;
    async fn delete_connection(&self, connection_id: &str) -> Result<(), AuthressError>;

    async fn get_tenant(&self, tenant_id: &str) -> Result<Tenant, AuthressError>;
    async fn create_tenant(&self, tenant: &Tenant) -> Result<Tenant, AuthressError>;
    async fn update_tenant(&self, tenant_id: &str, tenant: &Tenant) -> Result<Tenant, AuthressError>;
    async fn delete_tenant(&self, tenant_id: &str) -> Result<(), AuthressError>;
}

/// HTTPS implementation of [`AuthressApi`].
#[derive(Debug)]
pub struct AuthressClient {
    api_url: String,
    base: Url,
    http: reqwest::Client,
    // An unusable key is reported per call so the server can still start and
    // explain the misconfiguration to callers.
    credentials: Result<ServiceClientTokenProvider, String>,
    verifier: TokenVerifier,
}

impl AuthressClient {
    pub fn new(config: AuthressConfig) -> Result<Self, AuthressError> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        let base = Url::parse(&api_url)
            .map_err(|e| AuthressError::InvalidUrl(format!("{api_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(AuthressError::InvalidUrl(api_url));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let credentials =
            ServiceClientTokenProvider::new(&config.service_client_access_key, &api_url).map_err(
                |e| {
                    tracing::warn!(error = %e, "service client access key is unusable");
                    e.to_string()
                },
            );

        Ok(Self {
            verifier: TokenVerifier::new(&api_url, http.clone()),
            api_url,
            base,
            http,
            credentials,
        })
    }

    /// Build `{api_url}/{segments..}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AuthressError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AuthressError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn bearer(&self) -> Result<String, AuthressError> {
        match &self.credentials {
            Ok(provider) => provider.get_token(),
            Err(reason) => Err(AuthressError::InvalidAccessKey(reason.clone())),
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, AuthressError> {
        let response = request.bearer_auth(self.bearer()?).send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AuthressError> {
        Ok(self.execute(request).await?.json::<T>().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), AuthressError> {
        self.execute(request).await.map(|_| ())
    }
}

async fn check_status(response: Response) -> Result<Response, AuthressError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(AuthressError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AuthressApi for AuthressClient {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    fn check_service_client(&self) -> Result<(), AuthressError> {
        self.bearer().map(|_| ())
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, AuthressError> {
        self.verifier.verify(token).await
    }

    async fn authorize_user(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
    ) -> Result<(), AuthressError> {
        let url = self.endpoint(&[
            "v1",
            "users",
            user_id.as_str(),
            "resources",
            resource_uri,
            "permissions",
            permission.as_str(),
        ])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Err(AuthressError::Unauthorized {
                user_id: user_id.to_string(),
                resource_uri: resource_uri.to_string(),
                permission: permission.to_string(),
            }),
            _ => check_status(response).await.map(|_| ()),
        }
    }

    async fn get_user_resources(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
        limit: u32,
    ) -> Result<UserResources, AuthressError> {
        let url = self.endpoint(&["v1", "users", user_id.as_str(), "resources"])?;
        let limit = limit.to_string();
        let request = self.http.get(url).query(&[
            ("resourceUri", resource_uri),
            ("permissions", permission.as_str()),
            ("limit", limit.as_str()),
        ]);
        self.send_json(request).await
    }

    async fn get_user(&self, user_id: &UserId) -> Result<UserIdentity, AuthressError> {
        let url = self.endpoint(&["v1", "users", user_id.as_str()])?;
        self.send_json(self.http.get(url)).await
    }

    async fn get_resource_users(&self, resource_uri: &str) -> Result<ResourceUsers, AuthressError> {
        let url = self.endpoint(&["v1", "resources", resource_uri, "users"])?;
        self.send_json(self.http.get(url)).await
    }

    async fn get_record(&self, record_id: &str) -> Result<AccessRecord, AuthressError> {
        let url = self.endpoint(&["v1", "records", record_id])?;
        self.send_json(self.http.get(url)).await
    }

    async fn create_record(&self, record: &AccessRecord) -> Result<AccessRecord, AuthressError> {
        let url = self.endpoint(&["v1", "records"])?;
        self.send_json(self.http.post(url).json(record)).await
    }

    async fn update_record(
        &self,
        record_id: &str,
        record: &AccessRecord,
    ) -> Result<AccessRecord, AuthressError> {
        let url = self.endpoint(&["v1", "records", record_id])?;
        self.send_json(self.http.put(url).json(record)).await
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), AuthressError> {
        let url = self.endpoint(&["v1", "records", record_id])?;
        self.send_empty(self.http.delete(url)).await
    }

    async fn get_connection(&self, connection_id: &str) -> Result<Connection, AuthressError> {
        let url = self.endpoint(&["v1", "connections", connection_id])?;
        self.send_json(self.http.get(url)).await
    }

    async fn update_connection(
        &self,
        connection_id: &str,
        connection: &Connection,
    ) -> Result<Connection, AuthressError> {
        let url = self.endpoint(&["v1", "connections", connection_id])?;
        self.send_json(self.http.put(url).json(connection)).await
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), AuthressError> {
        let url = self.endpoint(&["v1", "connections", connection_id])?;
        self.send_empty(self.http.delete(url)).await
    }

    async fn get_tenant(&self, tenant_id: &str) -> Result<Tenant, AuthressError> {
        let url = self.endpoint(&["v1", "tenants", tenant_id])?;
        self.send_json(self.http.get(url)).await
    }

    async fn create_tenant(&self, tenant: &Tenant) -> Result<Tenant, AuthressError> {
        let url = self.endpoint(&["v1", "tenants"])?;
        self.send_json(self.http.post(url).json(tenant)).await
    }

    async fn update_tenant(&self, tenant_id: &str, tenant: &Tenant) -> Result<Tenant, AuthressError> {
        let url = self.endpoint(&["v1", "tenants", tenant_id])?;
        self.send_json(self.http.put(url).json(tenant)).await
    }

    async fn delete_tenant(&self, tenant_id: &str) -> Result<(), AuthressError> {
        let url = self.endpoint(&["v1", "tenants", tenant_id])?;
        self.send_empty(self.http.delete(url)).await
    }
}
