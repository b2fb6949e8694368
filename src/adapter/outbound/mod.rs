//! Outbound adapters (driven side).

mod command;
pub mod docker;
pub mod k3d;
pub mod kubectl;
pub mod notifier;
