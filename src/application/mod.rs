//! Application services: the cluster lifecycle core.
//!
//! - [`store`] - cluster records and their state machine
//! - [`network`] - API server port reservations
//! - [`registry`] - reference-counted shared registry
//! - [`hook`] - lifecycle hook scripts
//! - [`orchestrator`] - create, destroy, activate and recycle

pub mod hook;
pub mod network;
pub mod orchestrator;
pub mod registry;
pub mod store;
