//! # Configuration
//!
//! Client configuration: API location, viewer identity, paging and polling
//! parameters.

pub mod client;

pub use client::{ClientConfig, ConfigError};
