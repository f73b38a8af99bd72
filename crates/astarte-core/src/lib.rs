//! # astarte-core
//!
//! Core types and utilities for working with the Astarte APIs.
//!
//! This crate provides the shared error type, configuration, device identifier types and the
//! HTTP JSON client used by the service-specific crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`device_id`] - Canonical device IDs, aliases and identifier resolution
//! - [`config`] - Configuration structures for AppEngine clients
//! - [`client`] - HTTP transport configuration and the JSON request helper
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod device_id;
pub mod error;
pub mod query;

// Re-export commonly used types
pub use device_id::{DeviceId, DeviceIdentifier, DeviceIdentifierType};
pub use error::{Error, Result};
