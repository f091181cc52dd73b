//! CLI command handlers.
//!
//! Each handler takes a fully resolved [`IgenConfig`](crate::config::IgenConfig)
//! and reports to the console.

pub mod build;
pub mod cache;
pub mod status;
pub mod watch;
