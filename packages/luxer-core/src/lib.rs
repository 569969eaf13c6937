//! Luxer One Core Library
//!
//! This crate provides the pieces needed to follow pending packages in Luxer
//! One lockers for a single account:
//! - API client (JSON over HTTPS, token header, rejected-token detection)
//! - E-mail one-time-code login
//! - Background poller that groups pending deliveries by locker location
//!
//! # Example
//!
//! ```no_run
//! use luxer_core::{api, auth::AuthSession, coordinator::{Coordinator, CoordinatorConfig}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = api::load_config();
//!     let client = api::LuxerClient::new(&config.endpoint)?;
//!
//!     // Log in with a one-time code
//!     let mut session = AuthSession::new(client);
//!     let device = AuthSession::generate_device_identifier();
//!     session.request_code("resident@example.com").await?;
//!     let token = session.verify_code("resident@example.com", "123456", &device).await?;
//!     println!("Store this token: {}", token.as_str());
//!
//!     // Poll pending packages
//!     let handle = Coordinator::start(session.into_client(), CoordinatorConfig::default()).await?;
//!     let mut updates = handle.subscribe();
//!     updates.changed().await?;
//!     if let Some(view) = handle.view() {
//!         for location in handle.locations() {
//!             println!("{}: {}", location.name, view.pending_count(location.id));
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod coordinator;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use api::{ApiEndpointConfig, ConfigSource, LuxerClient, LuxerConfig};
pub use auth::AuthSession;
pub use coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorHandle, CoordinatorState, PollSnapshot,
};
pub use error::{ApiError, PollError, TransportError};
pub use model::{Delivery, DeviceIdentifier, Location, LocationId, LocationView, Token, UserInfo};
