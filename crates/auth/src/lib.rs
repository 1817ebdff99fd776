//! `accountgate-auth`: integration with the Authress authorization service.
//!
//! Permission evaluation, access records, token issuance and SSO federation
//! all live in Authress. This crate holds the client seam ([`AuthressApi`]),
//! its HTTP implementation, and the [`PermissionsService`] wrapper that the
//! API handlers talk to. It knows nothing about HTTP routing.

pub mod access_key;
pub mod client;
pub mod error;
pub mod model;
pub mod permissions;
pub mod roles;
pub mod service;
pub mod token;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use access_key::{ServiceClientAccessKey, ServiceClientTokenProvider};
pub use client::{AuthressApi, AuthressClient, AuthressConfig, DEFAULT_AUTHRESS_API_URL};
pub use error::AuthressError;
pub use model::{
    AccessRecord, AssignedUserRoles, Connection, ConnectionType, RecordStatus, ResourceRef,
    SsoConfiguration, SsoConnection, SsoTenant, Statement, Tenant, UserIdentity, UserRef,
    UserResources,
};
pub use permissions::Permission;
pub use roles::Role;
pub use service::{AuthressProperties, PermissionsService, account_record_id, sso_connection_id};
pub use token::{TokenVerifier, VerifiedIdentity};
