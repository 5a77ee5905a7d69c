//! Per-kind fragment builders.
//!
//! Each module adds methods to [`Synthesizer`](crate::Synthesizer) or
//! [`Ingress`](crate::Ingress) for one AWS service namespace.

mod apigateway;
mod ecs;
mod elb;
mod iam;
mod logs;
mod route53;

pub use ecs::{BASE_PATH_VAR, container_environment, effective_environment};
pub use elb::path_patterns;

/// Logical names shared across modules.
pub mod names {
    pub const LOG_GROUP: &str = "LogGroup";
    pub const EXECUTION_ROLE: &str = "ECSTaskExecutionRole";
    pub const TASK_ROLE: &str = "ECSTaskRole";
    pub const TASK_DEFINITION: &str = "TaskDefinition";
    pub const SERVICE: &str = "ECSService";
    pub const LB_CNAME: &str = "CName";
    pub const API_ALIAS: &str = "ApiDnsEntry";
    pub const REST_API: &str = "RestAPI";
    pub const CUSTOM_DOMAIN: &str = "CustomDomain";
    pub const BASE_PATH_MAPPING: &str = "BasePathMapping";
}
