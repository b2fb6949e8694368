//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture.
//! They are traits that adapters implement to integrate with the external
//! systems the orchestrator drives but does not own.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  (lifecycle orchestrator)│
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              │                         │              │
//!     │              └─────────────────────────┘              │
//!     │                  │              │                     │
//!     ▼                  ▼              ▼                     ▼
//! ┌───────────┐   ┌───────────┐  ┌────────────┐        ┌───────────┐
//! │Provisioner│   │ Registry  │  │ Kubeconfig │        │ Notifier  │
//! │  (k3d)    │   │ (docker)  │  │ (kubectl)  │        │  Adapter  │
//! └───────────┘   └───────────┘  └────────────┘        └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`Provisioner`] - Create, tear down and discover clusters
//! - [`RegistryRuntime`] - Start and stop the shared registry container
//! - [`KubeconfigMerger`] - Merge per-cluster kubeconfigs and select the active one
//! - [`Notifier`] - Lifecycle events (logging, CLI session, tests)

pub mod outbound;

pub use outbound::kubeconfig::{KubeconfigEntry, KubeconfigMerger};
pub use outbound::notifier::{Event, FailedStep, Notifier, NotifierRegistry, NullNotifier};
pub use outbound::provisioner::{
    DiscoveredCluster, ProvisionRequest, ProvisionedCluster, Provisioner,
};
pub use outbound::registry::RegistryRuntime;
