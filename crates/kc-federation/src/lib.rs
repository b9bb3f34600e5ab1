//! # kc-federation
//!
//! User federation framework for Keycloak Rust.
//!
//! This crate provides the base traits for user federation providers:
//! configuration, the identity model handed to the host, provider SPI
//! traits, and namespaced storage ids.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod storage_id;

pub use config::FederationConfig;
pub use error::{FederationError, FederationResult};
pub use model::{Attributes, GroupChange, GroupModel, UserChange, UserModel};
pub use provider::{
    CredentialInput, CredentialInputValidator, SearchParams, UserLookupProvider,
    UserQueryProvider, UserStorageProvider, UserStorageProviderFactory,
};
