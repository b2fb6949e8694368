use thiserror::Error;

use crate::domain::{ClusterId, ClusterState, RegistryConfig};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[source] toml::ser::Error),
}

/// Coarse classification of lifecycle failures.
///
/// Callers use this to decide how to present an error: validation and
/// resource errors are returned before anything changed, external failures
/// have already been rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request, rejected before any side effect.
    Validation,
    /// No free resource (port) to satisfy the request.
    ResourceExhaustion,
    /// Request conflicts with shared state (registry configuration).
    Conflict,
    /// The provisioning engine or container runtime failed.
    ExternalFailure,
    /// Another operation of the same kind is still running, or the
    /// orchestrator is shutting down.
    Concurrency,
}

/// Errors surfaced by the lifecycle orchestrator and its components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("a cluster named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("invalid cluster spec: {reason}")]
    InvalidSpec { reason: String },

    #[error("cluster {id} not found")]
    NotFound { id: ClusterId },

    #[error("cluster {id} cannot be activated while {state}")]
    NotActivatable { id: ClusterId, state: ClusterState },

    #[error("invalid transition '{transition}' for cluster {id} in state {from}")]
    InvalidTransition {
        id: ClusterId,
        from: ClusterState,
        transition: &'static str,
    },

    #[error("port {port} is not available")]
    PortUnavailable { port: u16 },

    #[error("no free API port after {attempts} attempts")]
    NoPortsAvailable { attempts: u32 },

    #[error("registry {requested} conflicts with running registry {existing}")]
    RegistryConfigConflict {
        existing: RegistryConfig,
        requested: RegistryConfig,
    },

    #[error("registry {name} could not be started: {reason}")]
    RegistryUnavailable { name: String, reason: String },

    #[error("provisioning of '{name}' failed: {reason}")]
    ProvisioningFailed { name: String, reason: String },

    #[error("teardown of '{name}' failed: {reason}")]
    TeardownFailed { name: String, reason: String },

    #[error("a recycle is already in progress")]
    RecycleInProgress,

    #[error("the orchestrator is shutting down")]
    ShuttingDown,

    #[error("no cluster to recycle")]
    PoolEmpty,

    #[error("no standby cluster available to take over")]
    NoStandbyAvailable,
}

impl LifecycleError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateName { .. }
            | Self::InvalidSpec { .. }
            | Self::NotFound { .. }
            | Self::NotActivatable { .. }
            | Self::InvalidTransition { .. }
            | Self::PoolEmpty
            | Self::NoStandbyAvailable => ErrorKind::Validation,
            Self::PortUnavailable { .. } | Self::NoPortsAvailable { .. } => {
                ErrorKind::ResourceExhaustion
            }
            Self::RegistryConfigConflict { .. } => ErrorKind::Conflict,
            Self::RegistryUnavailable { .. }
            | Self::ProvisioningFailed { .. }
            | Self::TeardownFailed { .. } => ErrorKind::ExternalFailure,
            Self::RecycleInProgress | Self::ShuttingDown => ErrorKind::Concurrency,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Command`] from a program name and failure reason.
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
