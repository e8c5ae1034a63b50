//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the podcast playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! the typed events it broadcasts to the UI layer, and the validated
//! configuration that wires host bridges together.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
