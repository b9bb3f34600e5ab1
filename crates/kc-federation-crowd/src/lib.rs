//! # kc-federation-crowd
//!
//! Atlassian Crowd federation provider for Keycloak Rust.
//!
//! Exposes Crowd users and their group hierarchy to the host as read-only
//! federated identities, and validates passwords against Crowd.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - IA-2: Identification and Authentication
//! - IA-5: Authenticator Management (passwords are verified by Crowd)
//! - AC-3: Access Enforcement (the directory is never written)
//! - SC-8: Transmission Confidentiality (HTTPS by default)
//!
//! ## Layout
//!
//! - [`client::CrowdClient`] is the directory boundary, implemented over
//!   HTTP by [`rest::RestCrowdClient`] and in memory by
//!   [`memory::InMemoryCrowdClient`]
//! - [`resolver::GroupResolver`] builds each user's [`group::GroupForest`]
//! - [`provider::CrowdStorageProvider`] implements the host SPI and is
//!   created by [`factory::CrowdStorageProviderFactory`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod factory;
pub mod group;
pub mod memory;
pub mod provider;
pub mod resolver;
pub mod rest;
pub mod restriction;
pub mod user;

pub use client::{CrowdClient, ALL_RESULTS};
pub use config::{CrowdConfig, HierarchyCyclePolicy};
pub use entity::{GroupRecord, UserRecord};
pub use error::{CrowdError, CrowdResult};
pub use factory::CrowdStorageProviderFactory;
pub use group::{GroupForest, GroupId, GroupNode, GroupRef};
pub use memory::InMemoryCrowdClient;
pub use provider::CrowdStorageProvider;
pub use resolver::GroupResolver;
pub use rest::RestCrowdClient;
pub use restriction::Restriction;
pub use user::CrowdUserAdapter;
