use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use stevedore_core::ContainerSpec;

use crate::docker::{DockerError, DockerExecutor, RealExecutor};

/// Image id as printed by `docker build --quiet`, e.g. `sha256:...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Port binding and environment for a local container run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRun {
    pub host_port: u16,
    pub container_port: u16,
    pub environment: BTreeMap<String, String>,
}

/// Docker image operations, parameterized over the executor for testability.
pub struct ImageBuilder<E: DockerExecutor = RealExecutor> {
    executor: E,
}

impl ImageBuilder<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for ImageBuilder<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor> ImageBuilder<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Build an image from `context` and apply every tag in `tags`.
    pub async fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        tags: &[String],
    ) -> Result<ImageId, BuildError> {
        let context_str = path_str(context)?;
        let dockerfile_str = path_str(dockerfile)?;

        let mut cmd = args(["build", "--quiet", "--file", dockerfile_str]);
        for tag in tags {
            cmd.push("--tag".to_owned());
            cmd.push(tag.clone());
        }
        cmd.push(context_str.to_owned());

        tracing::info!(context = context_str, dockerfile = dockerfile_str, "building image");
        let output = self
            .executor
            .exec(&cmd)
            .await
            .map_err(|e| BuildError::Build {
                context: context.to_path_buf(),
                source: e,
            })?;

        let id = output
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .ok_or_else(|| BuildError::MissingImageId {
                context: context.to_path_buf(),
            })?;

        tracing::debug!(image = id, tags = tags.len(), "image built");
        Ok(ImageId(id.to_owned()))
    }

    /// Build a container's image, resolving its context and Dockerfile
    /// against `project_dir`.
    pub async fn build_container(
        &self,
        project_dir: &Path,
        container: &ContainerSpec,
        tags: &[String],
    ) -> Result<ImageId, BuildError> {
        let context = project_dir.join(&container.context);
        let dockerfile = project_dir.join(&container.dockerfile);
        self.build(&context, &dockerfile, tags).await
    }

    pub async fn tag(&self, image: &str, new_tag: &str) -> Result<(), BuildError> {
        self.executor
            .exec(&args(["tag", image, new_tag]))
            .await
            .map_err(|e| BuildError::Tag {
                tag: new_tag.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn push(&self, reference: &str) -> Result<(), PushError> {
        tracing::info!(image = reference, "pushing image");
        self.executor
            .exec_streaming(&args(["push", reference]))
            .await
            .map_err(|e| PushError::Push {
                reference: reference.to_owned(),
                source: e,
            })
    }

    /// Log in to `registry` as the `AWS` user, passing the password on stdin.
    pub async fn login(&self, registry: &str, password: &str) -> Result<(), CredentialError> {
        self.executor
            .exec_with_stdin(
                &args(["login", "--username", "AWS", "--password-stdin", registry]),
                password.as_bytes(),
            )
            .await
            .map_err(|e| CredentialError::Login {
                registry: registry.to_owned(),
                source: e,
            })?;

        tracing::debug!(registry, "logged in to registry");
        Ok(())
    }

    /// Run an image in the foreground, removed on exit.
    pub async fn run_local(&self, image: &str, run: &LocalRun) -> Result<(), BuildError> {
        let mut cmd = args([
            "run",
            "--rm",
            "--publish",
            &format!("{}:{}", run.host_port, run.container_port),
        ]);
        for (key, value) in &run.environment {
            cmd.push("--env".to_owned());
            cmd.push(format!("{key}={value}"));
        }
        cmd.push(image.to_owned());

        tracing::info!(image, port = run.host_port, "running container locally");
        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| BuildError::Run {
                image: image.to_owned(),
                source: e,
            })
    }
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

fn path_str(path: &Path) -> Result<&str, BuildError> {
    path.to_str()
        .ok_or_else(|| BuildError::InvalidPath(path.to_path_buf()))
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("docker build failed for {context}")]
    Build { context: PathBuf, source: DockerError },

    #[error("docker build for {context} printed no image id")]
    MissingImageId { context: PathBuf },

    #[error("failed to tag image as {tag}")]
    Tag { tag: String, source: DockerError },

    #[error("failed to run image {image}")]
    Run { image: String, source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("failed to push {reference}")]
    Push { reference: String, source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to log in to registry {registry}")]
    Login { registry: String, source: DockerError },
}
