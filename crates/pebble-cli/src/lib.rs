//! pebble-cli library: exposes the command runner for testing.
//!
//! This is a thin layer over `pebble-core` that drives a `Browser` against
//! an in-memory store loaded from a JSON fixture.

pub mod commands;
pub mod config;

pub use commands::{Command, Session, load_store, render_tree, save_store};
pub use config::{Config, ConfigError, Overrides};
