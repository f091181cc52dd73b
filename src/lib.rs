//! # igen - incremental interface generator
//!
//! igen keeps generated C/C++ interface files in sync with the documented
//! function definitions in their sources. It is meant to run before every
//! compile, so it works hard at doing nothing:
//!
//! - an interface is only re-extracted when a source or the generated file
//!   changed since it was last checked (or when asked to with `--check`);
//! - a re-extracted interface is only written when its content changed, so
//!   translation units including it are not recompiled for nothing;
//! - the check cache is replaced in one atomic write at the end of a
//!   successful run, and left untouched by a failing one.
//!
//! ## Quick Start
//!
//! ```bash
//! # Regenerate stale interfaces, forwarding the compiler's flags
//! igen build -- -std=c++14 -Iinclude
//!
//! # See what would be regenerated
//! igen status
//! ```
//!
//! ## Module Organization
//!
//! - [`driver`] - The run loop over all interfaces
//! - [`artifact`] / [`staleness`] - Per-interface state and decisions
//! - [`extract`] / [`render`] - Declaration extraction and rendering
//! - [`manifest`] / [`config`] - Inputs
//! - [`commands`] - CLI command handlers

/// Per-interface state across a run.
pub mod artifact;

/// Persistent check cache (`toolchain/igen_cache`).
pub mod cache;

/// CLI command handlers.
pub mod commands;

/// Compiler flag sanitizing.
pub mod compiler_flags;

/// Configuration (`igen.toml`) and run flags.
pub mod config;

/// Documentation symlinks.
pub mod doc_link;

/// The run loop.
pub mod driver;

/// Library error type.
pub mod error;

/// Declaration extraction.
pub mod extract;

/// Interface manifest (`toolchain/igen_users`).
pub mod manifest;

/// Rendering generated files.
pub mod render;

/// Source file records.
pub mod source;

/// Staleness decisions.
pub mod staleness;

/// Terminal UI utilities (tables, ages).
pub mod ui;

pub use config::{IgenConfig, RunFlags};
pub use driver::{Driver, Pipeline, RunSummary};
pub use error::{IgenError, Result};
