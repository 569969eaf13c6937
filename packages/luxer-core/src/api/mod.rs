//! Luxer One API access.
//!
//! Provides the HTTP client for the resident API and its endpoint configuration.

mod client;
pub mod config;

pub use client::{LuxerClient, DEFAULT_BASE_URL};
pub use config::{load_config, AccountConfig, ApiEndpointConfig, ConfigSource, LuxerConfig};
