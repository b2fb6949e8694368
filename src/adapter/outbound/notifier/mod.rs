//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for the log and for in-process
//! subscribers such as the interactive CLI.

mod channel;
mod format;
mod log;

pub use channel::ChannelNotifier;
pub use format::describe;
pub use log::LogNotifier;
