//! `accountgate-core`: domain building blocks shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod account;
pub mod entity;
pub mod error;
pub mod id;
pub mod thing;

pub use account::{Account, AccountData};
pub use entity::Entity;
pub use error::DomainError;
pub use id::{AccountId, ThingId, UserId};
pub use thing::Thing;
