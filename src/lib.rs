//! kpool - a pool of local k3d clusters.
//!
//! Keeps one *active* cluster (the one kubectl points at) and a set of
//! pre-provisioned *standby* clusters, so that a fresh cluster is always a
//! `recycle` away: the newest standby is swapped in immediately while the
//! old active cluster is torn down and rebuilt in the background.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Cluster records, specs, registry configuration, hook invocations
//! - [`port`] - Traits for the provisioning engine, registry runtime,
//!   kubeconfig merger and notifiers
//! - [`application`] - Record store, network allocator, registry manager,
//!   hook runner and the lifecycle [`Orchestrator`]
//! - [`adapter`] - k3d/docker/kubectl adapters and the CLI
//! - [`infrastructure`] - Configuration and wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use kpool::infrastructure::bootstrap::build_orchestrator;
//! use kpool::infrastructure::config::settings::Config;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let pool = build_orchestrator(&config, None);
//! let spec = config.cluster.spec(None, config.registry.requested());
//! let cluster = pool.create(spec).await?;
//! println!("{} is active on port {}", cluster.name(), cluster.api_port);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use application::orchestrator::Orchestrator;
