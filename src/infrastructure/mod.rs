//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! lifecycle logic.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root wiring the k3d, docker and kubectl adapters
//! - [`config`] - Configuration loading and validation

pub mod bootstrap;
pub mod config;
