//! Core types and configuration for stevedore.
//!
//! This crate defines the `stevedore.toml` schema ([`StevedoreConfig`]),
//! the normalizer that turns it into a canonical [`ServiceConfig`], the
//! per-run [`DeploymentContext`], and shared error types.

pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod normalize;

pub use config::{
    CONFIG_FILE, ContainerDescriptor, DeploymentDescriptor, ServiceSection, StevedoreConfig,
};
pub use context::DeploymentContext;
pub use error::{Error, Result, ValidationError};
pub use model::{
    ContainerRole, ContainerSpec, HealthCheck, HostedZone, LoadBalancer, NetworkPlacement,
    Registry, SecretRef, SecretStore, ServiceConfig,
};
pub use normalize::normalize;
