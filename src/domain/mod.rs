//! Runtime-agnostic domain types.

mod cluster;
mod hook;
mod id;
mod name;
mod registry;

pub use cluster::{Cluster, ClusterSpec, ClusterState, INVALID_NAME_CHARS};
pub use hook::{HookAction, HookInvocation};
pub use id::ClusterId;
pub use name::{random_name, DEFAULT_NAME_PREFIX};
pub use registry::{RegistryConfig, RegistryMode};
