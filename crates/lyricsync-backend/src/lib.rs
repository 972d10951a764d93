//! Backend runtime entry point and public API surface.
//!
//! This crate owns the alignment session lifecycle: it routes bridge messages
//! to services, owns the single engine instance, waits on its stall timer and
//! persists configuration and learned corrections.

mod app;
mod clock;
mod config;
mod runtime;
mod services;
mod state;

pub use crate::clock::TokioClock;
pub use crate::config::{
    ConfigError, ConfigPaths, load_config, load_corrections, save_config, save_corrections,
};
pub use crate::runtime::{run, serve};
