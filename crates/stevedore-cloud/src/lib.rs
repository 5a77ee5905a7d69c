//! ECR repository and ECS deployment operations for stevedore.
//!
//! Everything goes through the `aws` CLI via [`AwsExecutor`], so the host's
//! configured credentials and profiles apply unchanged.

pub mod aws;
pub mod client;
pub mod executor;
pub mod staleness;

pub use aws::AwsError;
pub use client::{
    AwsClient, CredentialError, Deployment, DeploymentError, RegistryError, Repository,
};
pub use executor::{AwsExecutor, RealExecutor};
pub use staleness::{
    MarkerError, clear_deploy_start, primary_is_stale, read_deploy_start, record_deploy_start,
};
