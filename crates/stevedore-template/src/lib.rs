//! CloudFormation synthesis for stevedore.
//!
//! A normalized [`ServiceConfig`](stevedore_core::ServiceConfig) goes in,
//! an [`InfrastructureGraph`] of named resources comes out. The graph is then
//! merged into the host's [`Template`].

pub mod fragment;
pub mod graph;
pub mod resources;
pub mod secrets;
pub mod synth;
pub mod template;

pub use fragment::{Fragment, FragmentClass, Output, Resource, get_att, reference};
pub use graph::{GraphError, InfrastructureGraph};
pub use resources::names;
pub use resources::{BASE_PATH_VAR, container_environment, effective_environment, path_patterns};
pub use secrets::{ResolvedSecret, UnsupportedSecretType};
pub use synth::{Ingress, Route, Synthesis, SynthesisError, SynthesisOptions, Synthesizer};
pub use template::{Template, TemplateError};
