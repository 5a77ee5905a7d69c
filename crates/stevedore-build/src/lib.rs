//! Image tagging, building, and publishing for stevedore.
//!
//! # Publish pipeline
//!
//! ```text
//! stevedore push
//!   1. Tag      ── git rev-parse --short HEAD (+ "-dirty")
//!   2. Build    ── docker build --quiet, one image per container
//!   3. Login    ── aws ecr get-login-password | docker login --password-stdin
//!   4. Push     ── docker push, aborting on the first failure
//! ```

pub mod docker;
pub mod image;
pub mod tag;

pub use docker::{DockerError, DockerExecutor, RealExecutor};
pub use image::{BuildError, CredentialError, ImageBuilder, ImageId, LocalRun, PushError};
pub use tag::{TagError, is_dirty, source_tag};
