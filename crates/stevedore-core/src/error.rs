use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no stevedore.toml found in {dir}, create one with a [deployment] section")]
    ConfigMissing { dir: PathBuf },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid deployment config")]
    Validation(#[from] ValidationError),

    #[error("container '{0}' is not declared in stevedore.toml")]
    UnknownContainer(String),
}

/// Rejections raised while normalizing a service descriptor.
///
/// These are always fatal: nothing is built, pushed, or synthesized from a
/// descriptor that fails normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("`{0}` must be greater than zero")]
    ZeroValue(&'static str),

    #[error("at least one container must be declared")]
    NoContainers,

    #[error("container #{index} has an empty name")]
    EmptyContainerName { index: usize },

    #[error("container name '{name}' is declared more than once")]
    DuplicateContainerName { name: String },

    #[error("container name '{name}' must contain only ASCII letters and digits")]
    InvalidContainerName { name: String },

    #[error("containers '{first}' and '{second}' map to the same repository '{repository}'")]
    DuplicateRepositoryName {
        repository: String,
        first: String,
        second: String,
    },

    #[error("containers '{first}' and '{second}' are both routed at '{path}'")]
    DuplicateRoute {
        path: String,
        first: String,
        second: String,
    },

    #[error("container '{container}' path '{path}' has more than one segment")]
    NestedRoutePath { container: String, path: String },

    #[error("container '{container}' declares path '{path}' but no port")]
    PathWithoutPort { container: String, path: String },

    #[error("container '{container}' is routable but no hosted zone is configured")]
    IngressWithoutHostedZone { container: String },

    #[error("container '{container}' is routable but no load balancer listener is configured")]
    IngressWithoutListener { container: String },
}
